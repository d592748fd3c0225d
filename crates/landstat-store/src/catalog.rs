//! Named SQL queries
//!
//! A catalog maps names to SQL with two kinds of placeholder: `{slot}` for
//! identifiers (validated, then spliced) and `:bind` for values (bound by the
//! driver). Rendering refuses to produce a statement with an unfilled slot,
//! a missing bind or a surplus bind.

use crate::identifier::{Identifier, TableName};
use crate::sql::blank_literals;
use crate::{Result, StoreError};
use landstat_domain::{Bind, Statement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedQuery {
    /// Lookup name
    pub name: String,

    /// One-line description shown by `query --list`
    #[serde(default)]
    pub description: Option<String>,

    /// Column holding WKT geometry, if the query returns one
    #[serde(default)]
    pub geometry_column: Option<String>,

    /// SQL text with `{slot}` and `:bind` placeholders
    pub sql: String,
}

impl NamedQuery {
    /// `{slot}` names in first-use order
    pub fn slots(&self) -> Vec<String> {
        let mut slots = Vec::new();
        let mut rest = self.sql.as_str();
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end) => {
                    let slot = after[..end].trim().to_string();
                    if !slots.contains(&slot) {
                        slots.push(slot);
                    }
                    rest = &after[end + 1..];
                }
                None => break,
            }
        }
        slots
    }

    /// `:bind` names in first-use order, ignoring string literals
    pub fn bind_names(&self) -> Result<Vec<String>> {
        let code = blank_literals(&self.sql).map_err(StoreError::Config)?;
        let mut names = Vec::new();
        let mut chars = code.char_indices().peekable();

        while let Some((i, c)) = chars.next() {
            if c != ':' {
                continue;
            }
            let start = i + 1;
            let mut end = start;
            while let Some(&(j, n)) = chars.peek() {
                if n.is_ascii_alphanumeric() || n == '_' {
                    end = j + n.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            if end > start {
                let name = code[start..end].to_lowercase();
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "query")]
    queries: Vec<NamedQuery>,
}

/// Named queries keyed by name
#[derive(Debug, Clone, Default)]
pub struct QueryCatalog {
    queries: BTreeMap<String, NamedQuery>,
}

impl QueryCatalog {
    /// The catalog shipped with landstat
    pub fn builtin() -> Result<Self> {
        Self::from_toml(include_str!("queries.toml"))
    }

    /// Parse a catalog from TOML (`[[query]]` tables)
    pub fn from_toml(text: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(text)?;
        let mut catalog = Self::default();
        for query in file.queries {
            catalog.insert(query)?;
        }
        Ok(catalog)
    }

    /// Load a catalog file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml(&text)?;
        debug!(path = %path.display(), queries = catalog.len(), "loaded query catalog");
        Ok(catalog)
    }

    fn insert(&mut self, query: NamedQuery) -> Result<()> {
        if query.name.trim().is_empty() {
            return Err(StoreError::Config("query without a name".to_string()));
        }
        // reject broken SQL at load time rather than at render time
        query.bind_names()?;
        self.queries.insert(query.name.clone(), query);
        Ok(())
    }

    /// Add every query of `other`, replacing same-named entries
    pub fn merge(&mut self, other: QueryCatalog) {
        self.queries.extend(other.queries);
    }

    /// Look up a query
    pub fn get(&self, name: &str) -> Option<&NamedQuery> {
        self.queries.get(name)
    }

    /// All queries, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &NamedQuery> {
        self.queries.values()
    }

    /// Number of queries
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// True when empty
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Produce a statement from a named query
    ///
    /// `slots` fills `{slot}` placeholders (identifiers or `OWNER.TABLE`);
    /// `binds` must cover every `:bind` exactly.
    pub fn render(&self, name: &str, slots: &BTreeMap<String, String>, binds: Vec<Bind>) -> Result<Statement> {
        let query = self
            .get(name)
            .ok_or_else(|| StoreError::UnknownQuery(name.to_string()))?;

        let mut sql = query.sql.trim().to_string();
        for slot in query.slots() {
            let value = slots
                .get(&slot)
                .ok_or_else(|| StoreError::MissingPlaceholder(slot.clone()))?;
            let ident = if value.contains('.') {
                TableName::parse(value)?.to_string()
            } else {
                Identifier::new(value)?.to_string()
            };
            sql = sql.replace(&format!("{{{}}}", slot), &ident);
        }

        let rendered = NamedQuery {
            sql: sql.clone(),
            ..query.clone()
        };
        let needed = rendered.bind_names()?;
        for bind in &binds {
            if !needed.iter().any(|n| n.eq_ignore_ascii_case(&bind.name)) {
                return Err(StoreError::UnusedBind(bind.name.clone()));
            }
        }

        let mut statement = Statement::new(sql);
        for name in needed {
            let bind = binds
                .iter()
                .find(|b| b.name.eq_ignore_ascii_case(&name))
                .ok_or_else(|| StoreError::MissingBind(name.clone()))?;
            statement = statement.bind(name, bind.value.clone());
        }
        Ok(statement)
    }
}
