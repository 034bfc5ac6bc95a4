//! Declarative entity descriptors.
//!
//! An [`EntityDescriptor`] names a table, its own columns and the relations
//! it declares on other entities. Descriptors are plain data; the
//! [`association`](crate::association) module validates them and turns them
//! into a wired [`AssociationGraph`](crate::association::AssociationGraph).

pub mod catalog;

use std::collections::BTreeMap;

/// Identifier of an entity in a descriptor map (e.g. `"Stock"`).
pub type EntityName = &'static str;

/// The descriptor map consumed by the graph builder, ordered by entity name.
pub type Descriptors = BTreeMap<EntityName, EntityDescriptor>;

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

/// Storage type of a declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    BigInt,
    Boolean,
    Char(u16),
    Varchar(u16),
    Text,
    Timestamp,
    /// Text restricted to a fixed set of values.
    Enum(&'static [&'static str]),
}

impl ColumnType {
    /// PostgreSQL type for this column. Enums render as `TEXT`; their value
    /// set becomes a `CHECK` constraint in the table DDL.
    pub fn sql_type(&self) -> String {
        match self {
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Char(n) => format!("CHAR({n})"),
            ColumnType::Varchar(n) => format!("VARCHAR({n})"),
            ColumnType::Text | ColumnType::Enum(_) => "TEXT".to_string(),
            ColumnType::Timestamp => "TIMESTAMPTZ".to_string(),
        }
    }
}

/// A plain (non foreign-key) column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub ty: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    /// Raw SQL default expression, e.g. `"true"` or `"now()"`.
    pub default: Option<&'static str>,
}

impl ColumnDef {
    pub fn new(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
            unique: false,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default_sql(mut self, expr: &'static str) -> Self {
        self.default = Some(expr);
        self
    }
}

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

/// Referential action applied to a foreign-key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnDelete {
    #[default]
    NoAction,
    Cascade,
    SetNull,
}

impl OnDelete {
    pub fn sql(&self) -> &'static str {
        match self {
            OnDelete::NoAction => "NO ACTION",
            OnDelete::Cascade => "CASCADE",
            OnDelete::SetNull => "SET NULL",
        }
    }
}

/// One relation declared by an owner entity.
///
/// Where the foreign key lives depends on the group the declaration is
/// placed in: on the target for `has_one`/`has_many`, on the owner for
/// `belongs_to`, and on the junction for `belongs_to_many` (where
/// `foreign_key` points back at the owner and `other_key` at the target).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDecl {
    pub target: EntityName,
    pub foreign_key: &'static str,
    pub other_key: Option<&'static str>,
    pub through: Option<EntityName>,
    pub on_delete: OnDelete,
    pub required: bool,
}

impl RelationDecl {
    pub fn to(target: EntityName, foreign_key: &'static str) -> Self {
        Self {
            target,
            foreign_key,
            other_key: None,
            through: None,
            on_delete: OnDelete::NoAction,
            required: false,
        }
    }

    /// Route a many-to-many relation through `junction`.
    pub fn through(mut self, junction: EntityName, other_key: &'static str) -> Self {
        self.through = Some(junction);
        self.other_key = Some(other_key);
        self
    }

    pub fn on_delete(mut self, action: OnDelete) -> Self {
        self.on_delete = action;
        self
    }

    /// The foreign-key column is `NOT NULL`.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Columns shared by every entity table, overridable per entity.
fn fixed_columns(junction: bool) -> Vec<ColumnDef> {
    let mut columns = vec![ColumnDef::new("code", ColumnType::Varchar(100))];
    if !junction {
        columns.push(ColumnDef::new("name", ColumnType::Text).not_null());
    }
    columns.extend([
        ColumnDef::new("description", ColumnType::Text),
        ColumnDef::new("create_id", ColumnType::Text).not_null(),
        ColumnDef::new("create_name", ColumnType::Text).not_null(),
        ColumnDef::new("modify_id", ColumnType::Text),
        ColumnDef::new("modify_name", ColumnType::Text),
        ColumnDef::new("create_time", ColumnType::Timestamp)
            .not_null()
            .default_sql("now()"),
        ColumnDef::new("modify_time", ColumnType::Timestamp)
            .not_null()
            .default_sql("now()"),
    ]);
    columns
}

/// Declarative description of one entity table and its relations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub table: &'static str,
    pub columns: Vec<ColumnDef>,
    pub has_one: Vec<RelationDecl>,
    pub belongs_to: Vec<RelationDecl>,
    pub has_many: Vec<RelationDecl>,
    pub belongs_to_many: Vec<RelationDecl>,
    /// Association-only table: no surrogate `id`, no `name`.
    pub junction: bool,
}

impl EntityDescriptor {
    /// A regular entity with a surrogate `id` and the shared fixed columns.
    pub fn entity(table: &'static str) -> Self {
        Self::with_columns(table, false)
    }

    /// A junction entity linking two other entities.
    pub fn junction(table: &'static str) -> Self {
        Self::with_columns(table, true)
    }

    fn with_columns(table: &'static str, junction: bool) -> Self {
        Self {
            table,
            columns: fixed_columns(junction),
            has_one: Vec::new(),
            belongs_to: Vec::new(),
            has_many: Vec::new(),
            belongs_to_many: Vec::new(),
            junction,
        }
    }

    /// Add a column, replacing any fixed column of the same name in place.
    pub fn column(mut self, column: ColumnDef) -> Self {
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        self
    }

    pub fn has_one(mut self, relation: RelationDecl) -> Self {
        self.has_one.push(relation);
        self
    }

    pub fn belongs_to(mut self, relation: RelationDecl) -> Self {
        self.belongs_to.push(relation);
        self
    }

    pub fn has_many(mut self, relation: RelationDecl) -> Self {
        self.has_many.push(relation);
        self
    }

    pub fn belongs_to_many(mut self, relation: RelationDecl) -> Self {
        self.belongs_to_many.push(relation);
        self
    }
}
