use sqlx::{
    postgres::{PgArguments, PgRow},
    query::QueryAs,
    Arguments, Error as SqlxError, Executor, FromRow, Postgres,
};

/// Trait to define the schema of a database object for PostgreSQL.
pub trait SqlxSchema: Send + Sync + Unpin + Clone + std::fmt::Debug {
    /// The type of the primary key for this database object.
    type Id: Send + Sync + Clone + 'static + for<'q> sqlx::Encode<'q, Postgres> + sqlx::Type<Postgres>;

    /// The intermediate type that implements FromRow, used for fetching from the database.
    type Row: for<'r> FromRow<'r, PgRow> + Send + Unpin;

    const TABLE_NAME: &'static str;
    const ID_COLUMN_NAME: &'static str = "id";
    /// Every column of the table, in the order `SqlxCrud::bind_insert` binds them.
    const COLUMNS: &'static [&'static str];
    const INDEXES_SQL: &'static [&'static str] = &[];

    /// Retrieves the value of the primary key for an instance of the object.
    fn get_id_value(&self) -> Self::Id;

    /// Converts the intermediate Row type to the Self type.
    /// Fails with `SqlxError::Decode` when a stored value no longer parses.
    fn from_row(row: Self::Row) -> Result<Self, SqlxError>;

    fn create_table_sql() -> String;

    fn drop_table_sql() -> String {
        format!("DROP TABLE IF EXISTS {} CASCADE", Self::TABLE_NAME)
    }

    fn column_list() -> String {
        Self::COLUMNS.join(", ")
    }

    /// Example: "SELECT id, name FROM users"
    fn select_all_sql() -> String {
        format!("SELECT {} FROM {}", Self::column_list(), Self::TABLE_NAME)
    }

    /// Example: "SELECT id, name FROM users WHERE id = $1"
    fn select_by_id_sql() -> String {
        format!("{} WHERE {} = $1", Self::select_all_sql(), Self::ID_COLUMN_NAME)
    }

    /// Example: "INSERT INTO users (id, name) VALUES ($1, $2) RETURNING id, name"
    fn insert_sql() -> String {
        let placeholders = (1..=Self::COLUMNS.len())
            .map(|i| format!("${}", i))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            Self::TABLE_NAME, Self::column_list(), placeholders, Self::column_list()
        )
    }

    /// Every non-id column is set in `COLUMNS` order; the id is the last placeholder.
    /// Example: "UPDATE users SET name = $1 WHERE id = $2 RETURNING id, name"
    fn update_by_id_sql() -> String {
        let assignments = Self::COLUMNS
            .iter()
            .filter(|c| **c != Self::ID_COLUMN_NAME)
            .enumerate()
            .map(|(i, c)| format!("{} = ${}", c, i + 1))
            .collect::<Vec<_>>();
        format!(
            "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
            Self::TABLE_NAME,
            assignments.join(", "),
            Self::ID_COLUMN_NAME,
            assignments.len() + 1,
            Self::column_list()
        )
    }

    /// Example: "DELETE FROM users WHERE id = $1"
    fn delete_by_id_sql() -> String {
        format!("DELETE FROM {} WHERE {} = $1", Self::TABLE_NAME, Self::ID_COLUMN_NAME)
    }
}

/// Trait for CRUD (Create, Read, Update, Delete) operations for PostgreSQL.
#[async_trait::async_trait]
pub trait SqlxCrud: SqlxSchema + SqlxFilterQuery + Sized {
    /// Binds every column in `COLUMNS` order.
    fn bind_insert<'q>(&self, query: QueryAs<'q, Postgres, Self::Row, PgArguments>)
        -> QueryAs<'q, Postgres, Self::Row, PgArguments>;

    /// Binds the non-id columns in `COLUMNS` order, then the id for the WHERE clause.
    fn bind_update<'q>(&self, query: QueryAs<'q, Postgres, Self::Row, PgArguments>)
        -> QueryAs<'q, Postgres, Self::Row, PgArguments>;

    /// Creates a new record in the database.
    async fn create<'e, E>(self, executor: E) -> Result<Self, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        let sql = Self::insert_sql();
        let row = self.bind_insert(sqlx::query_as(&sql)).fetch_one(executor).await?;
        Self::from_row(row)
    }

    /// Finds a record by its primary key.
    async fn find_by_id<'e, E>(id: Self::Id, executor: E) -> Result<Option<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        let sql = Self::select_by_id_sql();
        let row = sqlx::query_as::<_, Self::Row>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;
        row.map(Self::from_row).transpose()
    }

    /// Updates an existing record. Fails with `SqlxError::RowNotFound` when the id is unknown.
    async fn update<'e, E>(self, executor: E) -> Result<Self, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        let sql = Self::update_by_id_sql();
        let row = self.bind_update(sqlx::query_as(&sql)).fetch_one(executor).await?;
        Self::from_row(row)
    }

    /// Deletes a record by its primary key, returning the number of rows removed.
    async fn delete<'e, E>(self, executor: E) -> Result<u64, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        let sql = Self::delete_by_id_sql();
        let result = sqlx::query(&sql)
            .bind(self.get_id_value())
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Specifies the direction for ordering query results.
#[derive(Debug, Clone, Copy)]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

// --- Filtering Structures and Trait ---

/// A trait to allow for boxing of different types that can be encoded as sqlx arguments.
pub trait AsSqlxArg: Send + Sync {
    fn add_to_args(&self, args: &mut PgArguments) -> Result<(), SqlxError>;
}

impl<T> AsSqlxArg for T
where
    T: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
{
    fn add_to_args(&self, args: &mut PgArguments) -> Result<(), SqlxError> {
        args.add(self.clone()).map_err(SqlxError::Encode)
    }
}

/// Represents a single filter condition for a database query.
pub struct FilterCondition {
    pub column: &'static str,
    pub operator: &'static str,
    /// Holds the value for the condition's placeholder. `None` renders `column operator`
    /// on its own, as in `character_id IS NULL`.
    pub value: Option<Box<dyn AsSqlxArg>>,
}

/// Represents the complete criteria for a filtered database query.
#[derive(Default)]
pub struct QueryCriteria {
    pub conditions: Vec<FilterCondition>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub order_by: Vec<(&'static str, OrderDirection)>,
    /// Appends `FOR UPDATE`, locking the selected rows until the transaction ends.
    pub for_update: bool,
}

impl QueryCriteria {
    /// Creates a new, empty `QueryCriteria` builder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id<V>(id: V) -> Self
    where
        V: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
    {
        Self::new().add_valued_filter("id", "=", id)
    }

    /// Adds a filter condition that may or may not have a value.
    pub fn add_filter<V>(mut self, column: &'static str, operator: &'static str, value: Option<V>) -> Self
    where
        V: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
    {
        self.conditions.push(FilterCondition {
            column,
            operator,
            value: value.map(|v| Box::new(v) as Box<dyn AsSqlxArg>),
        });
        self
    }

    /// A convenience method for `add_filter` that requires a value.
    pub fn add_valued_filter<V>(self, column: &'static str, operator: &'static str, value: V) -> Self
    where
        V: for<'a> sqlx::Encode<'a, Postgres> + sqlx::Type<Postgres> + Send + Sync + Clone + 'static,
    {
        self.add_filter(column, operator, Some(value))
    }

    /// Sets the LIMIT for the query.
    pub fn limit(mut self, limit_val: i64) -> Self {
        self.limit = Some(limit_val);
        self
    }

    /// Sets the OFFSET for the query.
    pub fn offset(mut self, offset_val: i64) -> Self {
        self.offset = Some(offset_val);
        self
    }

    /// Adds an ORDER BY clause.
    pub fn order_by(mut self, column: &'static str, direction: OrderDirection) -> Self {
        self.order_by.push((column, direction));
        self
    }

    pub fn for_update(mut self) -> Self {
        self.for_update = true;
        self
    }

    /// Renders the WHERE clause (with a leading space, or empty) and pushes its values into `args`.
    pub fn where_sql(&self, args: &mut PgArguments) -> Result<String, SqlxError> {
        if self.conditions.is_empty() {
            return Ok(String::new());
        }

        let mut placeholder = 0;
        let mut clauses = Vec::with_capacity(self.conditions.len());
        for condition in &self.conditions {
            match &condition.value {
                Some(value) => {
                    placeholder += 1;
                    value.add_to_args(args)?;
                    clauses.push(format!("{} {} ${}", condition.column, condition.operator, placeholder));
                }
                None => clauses.push(format!("{} {}", condition.column, condition.operator)),
            }
        }
        Ok(format!(" WHERE {}", clauses.join(" AND ")))
    }

    /// Renders ORDER BY, LIMIT, OFFSET and FOR UPDATE, in that order.
    pub fn tail_sql(&self) -> String {
        let mut sql = String::new();
        if !self.order_by.is_empty() {
            let order = self.order_by
                .iter()
                .map(|(column, direction)| format!("{} {}", column, direction.as_sql()))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" ORDER BY {}", order));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }
        if self.for_update {
            sql.push_str(" FOR UPDATE");
        }
        sql
    }
}

/// Trait for finding records based on dynamic filter criteria.
#[async_trait::async_trait]
pub trait SqlxFilterQuery: SqlxSchema + Sized {
    async fn find_by_criteria<'e, E>(
        criteria: QueryCriteria,
        executor: E,
    ) -> Result<Vec<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        let mut args = PgArguments::default();
        let sql = format!(
            "{}{}{}",
            Self::select_all_sql(),
            criteria.where_sql(&mut args)?,
            criteria.tail_sql()
        );
        let rows = sqlx::query_as_with::<_, Self::Row, _>(&sql, args)
            .fetch_all(executor)
            .await?;
        rows.into_iter().map(Self::from_row).collect()
    }

    /// Finds a single optional record, forcing LIMIT 1 when the criteria carry no limit.
    async fn find_one_by_criteria<'e, E>(
        mut criteria: QueryCriteria,
        executor: E,
    ) -> Result<Option<Self>, SqlxError>
    where
        E: Executor<'e, Database = Postgres> + Send,
    {
        if criteria.limit.is_none() {
            criteria = criteria.limit(1);
        };
        let mut results = Self::find_by_criteria(criteria, executor).await?;
        Ok(results.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Uuid;

    #[derive(Debug, Clone, sqlx::FromRow)]
    struct Lantern {
        id: Uuid,
        label: String,
        lit: bool,
    }

    impl SqlxSchema for Lantern {
        type Id = Uuid;
        type Row = Lantern;

        const TABLE_NAME: &'static str = "lanterns";
        const COLUMNS: &'static [&'static str] = &["id", "label", "lit"];

        fn get_id_value(&self) -> Uuid { self.id }
        fn from_row(row: Lantern) -> Result<Self, SqlxError> { Ok(row) }
        fn create_table_sql() -> String {
            "CREATE TABLE IF NOT EXISTS lanterns (id UUID PRIMARY KEY, label TEXT NOT NULL, lit BOOLEAN NOT NULL)".to_string()
        }
    }

    #[test]
    fn test_generated_crud_sql() {
        assert_eq!(Lantern::select_by_id_sql(), "SELECT id, label, lit FROM lanterns WHERE id = $1");
        assert_eq!(
            Lantern::insert_sql(),
            "INSERT INTO lanterns (id, label, lit) VALUES ($1, $2, $3) RETURNING id, label, lit"
        );
        assert_eq!(
            Lantern::update_by_id_sql(),
            "UPDATE lanterns SET label = $1, lit = $2 WHERE id = $3 RETURNING id, label, lit"
        );
        assert_eq!(Lantern::delete_by_id_sql(), "DELETE FROM lanterns WHERE id = $1");
        assert_eq!(Lantern::drop_table_sql(), "DROP TABLE IF EXISTS lanterns CASCADE");
    }

    #[test]
    fn test_criteria_numbers_only_valued_conditions() {
        let criteria = QueryCriteria::new()
            .add_valued_filter("label", "=", "hall".to_string())
            .add_filter::<Uuid>("owner_id", "IS NULL", None)
            .add_valued_filter("lit", "=", true);

        let mut args = PgArguments::default();
        let sql = criteria.where_sql(&mut args).unwrap();
        assert_eq!(sql, " WHERE label = $1 AND owner_id IS NULL AND lit = $2");
        assert_eq!(criteria.tail_sql(), "");
    }

    #[test]
    fn test_criteria_tail_ordering_and_lock() {
        let criteria = QueryCriteria::by_id(Uuid::new_v4())
            .order_by("created_at", OrderDirection::Asc)
            .order_by("id", OrderDirection::Desc)
            .limit(1)
            .offset(2)
            .for_update();

        assert_eq!(criteria.tail_sql(), " ORDER BY created_at ASC, id DESC LIMIT 1 OFFSET 2 FOR UPDATE");
    }

    #[test]
    fn test_empty_criteria_render_nothing() {
        let mut args = PgArguments::default();
        let criteria = QueryCriteria::new();
        assert_eq!(criteria.where_sql(&mut args).unwrap(), "");
        assert_eq!(criteria.tail_sql(), "");
    }
}
