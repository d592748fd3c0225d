//! SQL statements with named bind values

/// A value bound to a named SQL parameter
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    /// VARCHAR2 text
    Text(String),
    /// Text bound as a CLOB (large WKT)
    Clob(String),
    /// Integer number
    Integer(i64),
    /// Floating point number
    Number(f64),
}

/// A named bind (`:name` in the SQL text)
#[derive(Debug, Clone, PartialEq)]
pub struct Bind {
    /// Parameter name without the leading colon
    pub name: String,
    /// Bound value
    pub value: BindValue,
}

/// SQL text plus its binds
///
/// Values never appear in `sql`; only validated identifiers are spliced in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    /// SQL text with `:name` placeholders
    pub sql: String,
    /// Named binds, in first-use order
    pub binds: Vec<Bind>,
}

impl Statement {
    /// Create a statement with no binds
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds: Vec::new(),
        }
    }

    /// Add a bind, replacing any earlier bind of the same name
    pub fn bind(mut self, name: impl Into<String>, value: BindValue) -> Self {
        let name = name.into();
        match self.binds.iter_mut().find(|b| b.name == name) {
            Some(existing) => existing.value = value,
            None => self.binds.push(Bind { name, value }),
        }
        self
    }

    /// Look up a bind by name
    pub fn bind_value(&self, name: &str) -> Option<&BindValue> {
        self.binds.iter().find(|b| b.name == name).map(|b| &b.value)
    }
}
