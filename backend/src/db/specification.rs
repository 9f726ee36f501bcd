//! Declarative query shapes and the in-memory evaluator.
//!
//! A [`Specification`] is plain data: an optional filter, eager-load hints,
//! ordering, paging and an optional projection column. Backends either
//! translate it into their own query language (see the Postgres repository) or
//! run it through [`evaluate`] / [`project`] over materialized rows.
//!
//! Evaluation order is fixed:
//!
//! ```text
//! filter -> includes -> order -> paging -> projection (distinct)
//! ```
//!
//! Filtering always happens before paging, so a page is a window over the
//! matching rows only.

use std::cmp::Ordering;

use crate::models::{Entity, ScalarValue};

/// Row predicate over an entity's fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion<F> {
    /// Field equals the value.
    Eq(F, ScalarValue),
    /// Field equals any of the values. An empty list matches nothing.
    In(F, Vec<ScalarValue>),
    /// Text field contains the needle, ignoring case.
    Contains(F, String),
    /// Every nested criterion holds. An empty list matches everything.
    All(Vec<Criterion<F>>),
}

impl<F: Copy> Criterion<F> {
    /// Conjunction of two criteria, flattening nested `All`s.
    pub fn and(self, other: Criterion<F>) -> Criterion<F> {
        let mut parts = match self {
            Criterion::All(parts) => parts,
            single => vec![single],
        };
        match other {
            Criterion::All(more) => parts.extend(more),
            single => parts.push(single),
        }
        Criterion::All(parts)
    }

    pub fn matches<E>(&self, entity: &E) -> bool
    where
        E: Entity<Field = F>,
    {
        match self {
            Criterion::Eq(field, expected) => entity.value_of(*field).matches(expected),
            Criterion::In(field, candidates) => {
                let actual = entity.value_of(*field);
                candidates.iter().any(|candidate| actual.matches(candidate))
            }
            Criterion::Contains(field, needle) => match entity.value_of(*field) {
                ScalarValue::Text(haystack) => haystack
                    .to_lowercase()
                    .contains(&needle.to_lowercase()),
                _ => false,
            },
            Criterion::All(parts) => parts.iter().all(|part| part.matches(entity)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy<F> {
    pub field: F,
    pub direction: SortDirection,
}

impl<F: Copy> OrderBy<F> {
    pub fn compare<E>(&self, a: &E, b: &E) -> Ordering
    where
        E: Entity<Field = F>,
    {
        let ordering = a.value_of(self.field).compare(&b.value_of(self.field));
        match self.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// Skip/take window applied after filtering and ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub skip: usize,
    pub take: usize,
}

impl Paging {
    fn apply<T>(self, rows: Vec<T>) -> Vec<T> {
        rows.into_iter().skip(self.skip).take(self.take).collect()
    }
}

/// Immutable description of a query over `E`.
#[derive(Debug, Clone)]
pub struct Specification<E: Entity> {
    criteria: Option<Criterion<E::Field>>,
    includes: Vec<&'static str>,
    order_by: Option<OrderBy<E::Field>>,
    paging: Option<Paging>,
    select: Option<E::Field>,
}

impl<E: Entity> Default for Specification<E> {
    fn default() -> Self {
        Self {
            criteria: None,
            includes: Vec::new(),
            order_by: None,
            paging: None,
            select: None,
        }
    }
}

impl<E: Entity> Specification<E> {
    /// A specification matching every row, unordered and unpaged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter; repeated calls are combined with AND.
    pub fn filter(mut self, criterion: Criterion<E::Field>) -> Self {
        self.criteria = Some(match self.criteria.take() {
            Some(existing) => existing.and(criterion),
            None => criterion,
        });
        self
    }

    /// Ask the backend to eagerly load a related collection.
    pub fn include(mut self, relation: &'static str) -> Self {
        self.includes.push(relation);
        self
    }

    pub fn order_by(mut self, field: E::Field) -> Self {
        self.order_by = Some(OrderBy {
            field,
            direction: SortDirection::Ascending,
        });
        self
    }

    pub fn order_by_descending(mut self, field: E::Field) -> Self {
        self.order_by = Some(OrderBy {
            field,
            direction: SortDirection::Descending,
        });
        self
    }

    pub fn page(mut self, skip: usize, take: usize) -> Self {
        self.paging = Some(Paging { skip, take });
        self
    }

    /// Switch to projection mode: only distinct values of `field` are returned.
    pub fn select(mut self, field: E::Field) -> Self {
        self.select = Some(field);
        self
    }

    pub fn criteria(&self) -> Option<&Criterion<E::Field>> {
        self.criteria.as_ref()
    }

    pub fn includes(&self) -> &[&'static str] {
        &self.includes
    }

    pub fn ordering(&self) -> Option<&OrderBy<E::Field>> {
        self.order_by.as_ref()
    }

    pub fn paging(&self) -> Option<Paging> {
        self.paging
    }

    pub fn selector(&self) -> Option<E::Field> {
        self.select
    }

    /// Whether `entity` passes the filter.
    pub fn is_satisfied_by(&self, entity: &E) -> bool {
        self.criteria
            .as_ref()
            .map_or(true, |criterion| criterion.matches(entity))
    }
}

/// Shape materialized rows according to `spec`, ignoring any projection.
pub fn evaluate<E, I>(rows: I, spec: &Specification<E>) -> Vec<E>
where
    E: Entity,
    I: IntoIterator<Item = E>,
{
    let mut rows: Vec<E> = rows
        .into_iter()
        .filter(|row| spec.is_satisfied_by(row))
        .collect();

    if !spec.includes().is_empty() {
        log::debug!(
            "{} rows are fully materialized, include hints {:?} need no extra loading",
            E::NAME,
            spec.includes()
        );
    }

    if let Some(order) = spec.ordering() {
        // Stable sort: ties keep the incoming (id) order.
        rows.sort_by(|a, b| order.compare(a, b));
    }

    match spec.paging() {
        Some(paging) => paging.apply(rows),
        None => rows,
    }
}

/// Run `spec` in projection mode.
///
/// Returns `None` when the specification has no selector. Duplicates are
/// dropped keeping the first occurrence, so the ordering survives.
pub fn project<E, I>(rows: I, spec: &Specification<E>) -> Option<Vec<ScalarValue>>
where
    E: Entity,
    I: IntoIterator<Item = E>,
{
    let field = spec.selector()?;
    let values = evaluate(rows, spec)
        .into_iter()
        .map(|row| row.value_of(field));
    Some(distinct(values))
}

/// Number of rows passing the filter. Ordering and paging are ignored.
pub fn count<'a, E, I>(rows: I, spec: &Specification<E>) -> usize
where
    E: Entity,
    I: IntoIterator<Item = &'a E>,
{
    rows.into_iter()
        .filter(|row| spec.is_satisfied_by(row))
        .count()
}

/// Order-preserving de-duplication under [`ScalarValue::matches`].
pub fn distinct<I>(values: I) -> Vec<ScalarValue>
where
    I: IntoIterator<Item = ScalarValue>,
{
    let mut unique: Vec<ScalarValue> = Vec::new();
    for value in values {
        if !unique.iter().any(|seen| seen.matches(&value)) {
            unique.push(value);
        }
    }
    unique
}
