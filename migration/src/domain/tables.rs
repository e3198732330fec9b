use marquee_common::{ARTICLES_TABLE_NAME, CREATED_FIELD_NAME, ID_FIELD_NAME};

/// Represents table in a database, used for ddl generation
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
}

/// Represents one column in the database table
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub not_null: bool,
    pub primary_key: bool,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Boolean,
    Timestamp,
    Json,
}

/// Represents an index in the database table
pub struct Index {
    pub table_name: String,
    pub columns: Vec<String>,
    pub descending: bool,
}

impl ColumnType {
    pub fn sql(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Timestamp => "TIMESTAMPTZ",
            ColumnType::Json => "JSONB",
        }
    }
}

impl Column {
    pub fn required(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            not_null: true,
            primary_key: false,
            default_value: None,
        }
    }

    pub fn optional(name: &str, column_type: ColumnType) -> Self {
        Self {
            not_null: false,
            ..Self::required(name, column_type)
        }
    }

    pub fn primary_key(name: &str, column_type: ColumnType) -> Self {
        Self {
            primary_key: true,
            ..Self::required(name, column_type)
        }
    }

    pub fn with_default(mut self, value: &str) -> Self {
        self.default_value = Some(value.to_string());
        self
    }
}

/// The article record layout. Counter parameters that do not apply to the
/// stored counter mode are NULL.
pub fn articles_table() -> Table {
    use ColumnType::*;

    let columns = vec![
        Column::primary_key(ID_FIELD_NAME, Text),
        Column::required(CREATED_FIELD_NAME, Timestamp).with_default("now()"),
        Column::required("title", Text),
        Column::required("excerpt", Text).with_default("''"),
        Column::required("content", Text).with_default("''"),
        Column::optional("image", Text),
        Column::required("category", Text),
        Column::required("keywords", Text).with_default("''"),
        Column::required("target_url", Text),
        Column::required("placement", Text).with_default("'grid'"),
        Column::required("show_ads", Boolean).with_default("true"),
        Column::required("landing_gate", Boolean).with_default("false"),
        Column::required("auto_refresh", Boolean).with_default("false"),
        Column::required("counter_mode", Text).with_default("'fixed-countdown'"),
        Column::optional("counter_fixed", Integer),
        Column::optional("counter_min", Integer),
        Column::optional("counter_max", Integer),
        Column::required("lead_mode", Text).with_default("'none'"),
        Column::required("traffic_routing", Text).with_default("'direct'"),
        Column::required("specs", Json).with_default("'[]'::jsonb"),
        Column::required("info_boxes", Json).with_default("'[]'::jsonb"),
    ];

    let indexes = vec![Index {
        table_name: ARTICLES_TABLE_NAME.to_string(),
        columns: vec![CREATED_FIELD_NAME.to_string()],
        descending: true,
    }];

    Table {
        name: ARTICLES_TABLE_NAME.to_string(),
        columns,
        indexes,
    }
}
