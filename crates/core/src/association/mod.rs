//! Association graph: table handles wired together from entity descriptors.
//!
//! [`AssociationGraphBuilder`] validates a [`Descriptors`] map, materializes
//! one [`TableHandle`] per entity (memoized by entity name, so a target
//! shared by several owners is wired exactly once), registers every declared
//! relation on its owner, places foreign-key columns on the tables that hold
//! them and orders tables so that referenced tables are created first.
//!
//! All structural checks run before anything is handed to a [`SchemaSync`];
//! a malformed descriptor map never reaches storage. The resulting
//! [`AssociationGraph`] is immutable and meant to be built once at startup
//! and shared behind an `Arc`.

mod ddl;

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

use async_trait::async_trait;

use crate::schema::{ColumnDef, Descriptors, EntityDescriptor, EntityName, OnDelete, RelationDecl};

pub use ddl::quote_ident;

// ---------------------------------------------------------------------------
// Relation kinds and errors
// ---------------------------------------------------------------------------

/// How an owner entity relates to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    HasOne,
    BelongsTo,
    HasMany,
    BelongsToMany,
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RelationKind::HasOne => "hasOne",
            RelationKind::BelongsTo => "belongsTo",
            RelationKind::HasMany => "hasMany",
            RelationKind::BelongsToMany => "belongsToMany",
        };
        f.write_str(label)
    }
}

/// Structural failure while validating, wiring or syncing the graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("{entity}.{kind}[{index}] targets unknown entity '{target}'")]
    UnknownTarget {
        entity: EntityName,
        kind: RelationKind,
        index: usize,
        target: EntityName,
    },

    #[error("{entity}.{kind}[{index}] routes through unknown junction '{through}'")]
    UnknownJunction {
        entity: EntityName,
        kind: RelationKind,
        index: usize,
        through: EntityName,
    },

    #[error("Malformed descriptor for {entity}: {reason}")]
    Malformed { entity: EntityName, reason: String },

    #[error("Foreign keys form a cycle between tables {0:?}")]
    Cycle(Vec<&'static str>),

    #[error("Schema sync failed: {0}")]
    Sync(String),
}

fn malformed(entity: EntityName, reason: impl Into<String>) -> GraphError {
    GraphError::Malformed {
        entity,
        reason: reason.into(),
    }
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Index of a [`TableHandle`] inside its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(usize);

/// A relation registered on its owner's handle, with resolved endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub kind: RelationKind,
    pub target: TableId,
    pub through: Option<TableId>,
    pub foreign_key: &'static str,
    pub other_key: Option<&'static str>,
    pub on_delete: OnDelete,
    pub required: bool,
}

/// A foreign-key column placed on the table that physically holds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references: TableId,
    pub required: bool,
    pub on_delete: OnDelete,
}

/// Materialized storage-table handle for one entity.
#[derive(Debug, Clone)]
pub struct TableHandle {
    pub entity: EntityName,
    pub table: &'static str,
    pub columns: Vec<ColumnDef>,
    pub junction: bool,
    pub relations: Vec<Relation>,
    pub foreign_keys: Vec<ForeignKey>,
    /// Column pairs that are unique together (junction keys).
    pub unique_pairs: Vec<(&'static str, &'static str)>,
}

impl TableHandle {
    fn new(entity: EntityName, descriptor: &EntityDescriptor) -> Self {
        Self {
            entity,
            table: descriptor.table,
            columns: descriptor.columns.clone(),
            junction: descriptor.junction,
            relations: Vec::new(),
            foreign_keys: Vec::new(),
            unique_pairs: Vec::new(),
        }
    }
}

/// Column names of a many-to-many junction, seen from the owner side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JunctionRef {
    pub table: &'static str,
    pub owner_key: &'static str,
    pub target_key: &'static str,
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

/// The wired, immutable relation graph.
#[derive(Debug, Clone)]
pub struct AssociationGraph {
    handles: Vec<TableHandle>,
    index: HashMap<EntityName, TableId>,
    order: Vec<TableId>,
}

impl AssociationGraph {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn table_id(&self, entity: &str) -> Option<TableId> {
        self.index.get(entity).copied()
    }

    pub fn handle(&self, id: TableId) -> &TableHandle {
        &self.handles[id.0]
    }

    pub fn get(&self, entity: &str) -> Option<&TableHandle> {
        self.table_id(entity).map(|id| self.handle(id))
    }

    /// Relations registered on `entity`, empty for unknown entities.
    pub fn relations_of(&self, entity: &str) -> &[Relation] {
        self.get(entity)
            .map(|h| h.relations.as_slice())
            .unwrap_or_default()
    }

    /// The first many-to-many relation from `owner` to `target`.
    pub fn many_to_many(&self, owner: &str, target: &str) -> Option<JunctionRef> {
        let target = self.table_id(target)?;
        self.find_junction(owner, |r| r.target == target)
    }

    /// The many-to-many relation from `owner` routed through `through`.
    ///
    /// Use this when an owner reaches the same target through more than one
    /// junction.
    pub fn junction(&self, owner: &str, through: &str) -> Option<JunctionRef> {
        let through = self.table_id(through)?;
        self.find_junction(owner, |r| r.through == Some(through))
    }

    fn find_junction(
        &self,
        owner: &str,
        matches: impl Fn(&Relation) -> bool,
    ) -> Option<JunctionRef> {
        self.relations_of(owner)
            .iter()
            .filter(|r| r.kind == RelationKind::BelongsToMany)
            .find(|r| matches(r))
            .and_then(|r| {
                Some(JunctionRef {
                    table: self.handle(r.through?).table,
                    owner_key: r.foreign_key,
                    target_key: r.other_key?,
                })
            })
    }

    /// Handles ordered so that every table comes after the tables it references.
    pub fn creation_order(&self) -> impl Iterator<Item = &TableHandle> {
        self.order.iter().map(|id| self.handle(*id))
    }
}

// ---------------------------------------------------------------------------
// Schema sync seam
// ---------------------------------------------------------------------------

/// Applies a built graph to storage. Called exactly once per build.
#[async_trait]
pub trait SchemaSync: Send + Sync {
    async fn sync(&self, graph: &AssociationGraph) -> Result<(), GraphError>;
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Iterate a descriptor's relations with their kind and per-kind index.
fn declared_relations(
    descriptor: &EntityDescriptor,
) -> impl Iterator<Item = (RelationKind, usize, &RelationDecl)> + '_ {
    [
        (RelationKind::HasOne, &descriptor.has_one),
        (RelationKind::BelongsTo, &descriptor.belongs_to),
        (RelationKind::HasMany, &descriptor.has_many),
        (RelationKind::BelongsToMany, &descriptor.belongs_to_many),
    ]
    .into_iter()
    .flat_map(|(kind, decls)| {
        decls
            .iter()
            .enumerate()
            .map(move |(index, decl)| (kind, index, decl))
    })
}

/// Builds an [`AssociationGraph`] from a descriptor map.
pub struct AssociationGraphBuilder<'a> {
    descriptors: &'a Descriptors,
}

impl<'a> AssociationGraphBuilder<'a> {
    pub fn new(descriptors: &'a Descriptors) -> Self {
        Self { descriptors }
    }

    /// Check every descriptor and relation without wiring anything.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut tables = HashSet::new();

        for (&entity, descriptor) in self.descriptors {
            if descriptor.table.is_empty() {
                return Err(malformed(entity, "table name is empty"));
            }
            if !tables.insert(descriptor.table) {
                return Err(malformed(
                    entity,
                    format!("table '{}' is declared twice", descriptor.table),
                ));
            }

            let mut columns = HashSet::new();
            for column in &descriptor.columns {
                if column.name.is_empty() || !columns.insert(column.name) {
                    return Err(malformed(
                        entity,
                        format!("column '{}' is empty or duplicated", column.name),
                    ));
                }
            }

            for (kind, index, decl) in declared_relations(descriptor) {
                self.validate_relation(entity, kind, index, decl)?;
            }
        }

        Ok(())
    }

    fn validate_relation(
        &self,
        entity: EntityName,
        kind: RelationKind,
        index: usize,
        decl: &RelationDecl,
    ) -> Result<(), GraphError> {
        if decl.foreign_key.is_empty() {
            return Err(malformed(
                entity,
                format!("{kind}[{index}] has no foreign key"),
            ));
        }
        if !self.descriptors.contains_key(decl.target) {
            return Err(GraphError::UnknownTarget {
                entity,
                kind,
                index,
                target: decl.target,
            });
        }

        if kind != RelationKind::BelongsToMany {
            if decl.through.is_some() {
                return Err(malformed(
                    entity,
                    format!("{kind}[{index}] cannot route through a junction"),
                ));
            }
            return Ok(());
        }

        let through = decl.through.ok_or_else(|| {
            malformed(entity, format!("{kind}[{index}] names no junction"))
        })?;
        let junction = self
            .descriptors
            .get(through)
            .ok_or(GraphError::UnknownJunction {
                entity,
                kind,
                index,
                through,
            })?;
        if !junction.junction {
            return Err(malformed(
                entity,
                format!("{kind}[{index}] routes through '{through}', which is not a junction"),
            ));
        }
        match decl.other_key {
            Some(key) if !key.is_empty() && key != decl.foreign_key => Ok(()),
            _ => Err(malformed(
                entity,
                format!("{kind}[{index}] needs an other key distinct from its foreign key"),
            )),
        }
    }

    /// Validate, wire and order the graph. Storage is not touched.
    pub fn build(&self) -> Result<AssociationGraph, GraphError> {
        self.validate()?;

        let mut wiring = Wiring::default();
        for &entity in self.descriptors.keys() {
            wiring.materialize(self.descriptors, entity)?;
        }

        let Wiring { mut handles, cache } = wiring;
        place_foreign_keys(&mut handles)?;
        let order = creation_order(&handles)?;

        Ok(AssociationGraph {
            handles,
            index: cache,
            order,
        })
    }

    /// Build the graph, then synchronize storage with it exactly once.
    pub async fn build_and_sync(
        &self,
        sync: &dyn SchemaSync,
    ) -> Result<AssociationGraph, GraphError> {
        let graph = self.build()?;
        sync.sync(&graph).await?;
        tracing::info!(tables = graph.len(), "Association graph synchronized");
        Ok(graph)
    }
}

/// Memoized handle arena used while wiring.
#[derive(Default)]
struct Wiring {
    handles: Vec<TableHandle>,
    cache: HashMap<EntityName, TableId>,
}

impl Wiring {
    fn materialize(
        &mut self,
        descriptors: &Descriptors,
        entity: EntityName,
    ) -> Result<TableId, GraphError> {
        if let Some(&id) = self.cache.get(entity) {
            return Ok(id);
        }

        let descriptor = descriptors
            .get(entity)
            .ok_or_else(|| malformed(entity, "entity is not declared"))?;
        let id = TableId(self.handles.len());
        self.handles.push(TableHandle::new(entity, descriptor));
        // Cached before recursing so cyclic declarations terminate.
        self.cache.insert(entity, id);

        for (kind, _, decl) in declared_relations(descriptor) {
            let target = self.materialize(descriptors, decl.target)?;
            let through = decl
                .through
                .map(|junction| self.materialize(descriptors, junction))
                .transpose()?;

            self.handles[id.0].relations.push(Relation {
                kind,
                target,
                through,
                foreign_key: decl.foreign_key,
                other_key: decl.other_key,
                on_delete: decl.on_delete,
                required: decl.required,
            });
        }

        Ok(id)
    }
}

/// Put each relation's foreign-key columns on the table that holds them,
/// merging duplicates declared from both ends of a relation.
fn place_foreign_keys(handles: &mut [TableHandle]) -> Result<(), GraphError> {
    let mut placements: Vec<(TableId, ForeignKey)> = Vec::new();
    let mut pairs: Vec<(TableId, (&'static str, &'static str))> = Vec::new();

    for (i, handle) in handles.iter().enumerate() {
        let owner = TableId(i);
        for relation in &handle.relations {
            match relation.kind {
                RelationKind::HasOne | RelationKind::HasMany => placements.push((
                    relation.target,
                    ForeignKey {
                        column: relation.foreign_key,
                        references: owner,
                        required: relation.required,
                        on_delete: relation.on_delete,
                    },
                )),
                RelationKind::BelongsTo => placements.push((
                    owner,
                    ForeignKey {
                        column: relation.foreign_key,
                        references: relation.target,
                        required: relation.required,
                        on_delete: relation.on_delete,
                    },
                )),
                RelationKind::BelongsToMany => {
                    let (Some(junction), Some(other_key)) = (relation.through, relation.other_key)
                    else {
                        continue;
                    };
                    for (column, references) in
                        [(relation.foreign_key, owner), (other_key, relation.target)]
                    {
                        placements.push((
                            junction,
                            ForeignKey {
                                column,
                                references,
                                required: true,
                                on_delete: OnDelete::Cascade,
                            },
                        ));
                    }
                    let pair = if relation.foreign_key <= other_key {
                        (relation.foreign_key, other_key)
                    } else {
                        (other_key, relation.foreign_key)
                    };
                    pairs.push((junction, pair));
                }
            }
        }
    }

    for (holder, key) in placements {
        let referenced = &handles[key.references.0];
        if referenced.junction {
            return Err(malformed(
                handles[holder.0].entity,
                format!(
                    "foreign key '{}' references junction '{}'",
                    key.column, referenced.entity
                ),
            ));
        }
        let referenced_entity = referenced.entity;

        let holder_handle = &mut handles[holder.0];
        if holder_handle.columns.iter().any(|c| c.name == key.column) {
            return Err(malformed(
                holder_handle.entity,
                format!("foreign key '{}' collides with a declared column", key.column),
            ));
        }

        match holder_handle
            .foreign_keys
            .iter_mut()
            .find(|fk| fk.column == key.column)
        {
            Some(existing) if existing.references != key.references => {
                return Err(malformed(
                    holder_handle.entity,
                    format!(
                        "foreign key '{}' references both a second table and '{}'",
                        key.column, referenced_entity
                    ),
                ));
            }
            Some(existing) => {
                existing.required |= key.required;
                if existing.on_delete == OnDelete::NoAction {
                    existing.on_delete = key.on_delete;
                }
            }
            None => holder_handle.foreign_keys.push(key),
        }
    }

    for (junction, pair) in pairs {
        let handle = &mut handles[junction.0];
        if !handle.unique_pairs.contains(&pair) {
            handle.unique_pairs.push(pair);
        }
    }

    Ok(())
}

/// Kahn's algorithm over foreign-key dependencies. Self references are
/// ignored; any other cycle is an error.
fn creation_order(handles: &[TableHandle]) -> Result<Vec<TableId>, GraphError> {
    let n = handles.len();
    let mut indegree = vec![0usize; n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];

    for (i, handle) in handles.iter().enumerate() {
        let deps: BTreeSet<usize> = handle
            .foreign_keys
            .iter()
            .map(|fk| fk.references.0)
            .filter(|&d| d != i)
            .collect();
        indegree[i] = deps.len();
        for d in deps {
            dependents[d].push(i);
        }
    }

    let mut ready: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(i) = ready.pop_front() {
        order.push(TableId(i));
        for &j in &dependents[i] {
            indegree[j] -= 1;
            if indegree[j] == 0 {
                ready.push_back(j);
            }
        }
    }

    if order.len() != n {
        let stuck = (0..n)
            .filter(|&i| indegree[i] > 0)
            .map(|i| handles[i].table)
            .collect();
        return Err(GraphError::Cycle(stuck));
    }

    Ok(order)
}
