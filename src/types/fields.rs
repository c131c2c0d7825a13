//! Field tables of structured descriptors

use super::descr::Descr;
use crate::error::{ArrayError, Result};
use std::collections::HashSet;
use std::sync::Arc;

/// One named sub-range of a structured element
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    title: Option<String>,
    descr: Arc<Descr>,
    offset: usize,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alternate name the field can also be looked up by
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn descr(&self) -> &Arc<Descr> {
        &self.descr
    }

    /// Byte offset inside the parent element
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn with_descr(&self, descr: Arc<Descr>) -> Field {
        Field {
            descr,
            ..self.clone()
        }
    }

    pub(crate) fn with_name(&self, name: &str) -> Field {
        Field {
            name: name.to_owned(),
            ..self.clone()
        }
    }
}

/// Ordered field table
///
/// A title is stored on the entry it aliases, so iteration visits every
/// field exactly once while lookups accept either the name or the title.
#[derive(Debug, Clone, Default)]
pub struct Fields {
    entries: Vec<Field>,
}

impl Fields {
    pub(crate) fn from_entries(entries: Vec<Field>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(Field::name)
    }

    /// Find a field by name or title
    pub fn get(&self, key: &str) -> Option<&Field> {
        self.entries
            .iter()
            .find(|f| f.name == key)
            .or_else(|| self.entries.iter().find(|f| f.title() == Some(key)))
    }
}

impl<'a> IntoIterator for &'a Fields {
    type Item = &'a Field;
    type IntoIter = std::slice::Iter<'a, Field>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Builder for structured descriptors
///
/// Fields are laid out one after another, packed by default or padded to each
/// field's alignment with [`RecordBuilder::aligned`]. Explicit offsets may
/// overlap earlier fields.
///
/// ```
/// use ndstride::{Descr, RecordBuilder, TypeTag};
///
/// let point = RecordBuilder::aligned()
///     .field("tag", Descr::builtin(TypeTag::UInt8))
///     .field("x", Descr::builtin(TypeTag::Float64))
///     .build()
///     .unwrap();
/// assert_eq!(point.itemsize(), 16);
/// assert_eq!(point.field("x").unwrap().offset(), 8);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    fields: Vec<Field>,
    aligned: bool,
    cursor: usize,
    itemsize: Option<usize>,
}

impl RecordBuilder {
    /// Packed layout, no padding
    pub fn new() -> Self {
        Self::default()
    }

    /// C-struct layout: every field starts at a multiple of its alignment
    pub fn aligned() -> Self {
        Self {
            aligned: true,
            ..Self::default()
        }
    }

    /// Append a field after the previous one
    pub fn field(self, name: impl Into<String>, descr: Arc<Descr>) -> Self {
        let offset = if self.aligned {
            self.cursor
                .checked_next_multiple_of(descr.alignment().max(1))
                .unwrap_or(usize::MAX)
        } else {
            self.cursor
        };
        self.field_at(name, descr, offset)
    }

    /// Place a field at an explicit byte offset
    ///
    /// A field whose end overflows `usize` leaves the running size alone and
    /// is rejected by [`build`](Self::build).
    pub fn field_at(mut self, name: impl Into<String>, descr: Arc<Descr>, offset: usize) -> Self {
        if let Some(end) = offset.checked_add(descr.itemsize()) {
            self.cursor = self.cursor.max(end);
        }
        self.fields.push(Field {
            name: name.into(),
            title: None,
            descr,
            offset,
        });
        self
    }

    /// Attach a title alias to the most recently added field
    pub fn title(mut self, title: impl Into<String>) -> Self {
        if let Some(last) = self.fields.last_mut() {
            last.title = Some(title.into());
        }
        self
    }

    /// Force the total item size (must cover every field)
    pub fn itemsize(mut self, itemsize: usize) -> Self {
        self.itemsize = Some(itemsize);
        self
    }

    pub fn build(self) -> Result<Arc<Descr>> {
        let mut seen = HashSet::new();
        for key in self
            .fields
            .iter()
            .flat_map(|f| std::iter::once(f.name()).chain(f.title()))
        {
            if !seen.insert(key) {
                return Err(ArrayError::value(format!("duplicate field name {key:?}")));
            }
        }

        let alignment = if self.aligned {
            self.fields
                .iter()
                .map(|f| f.descr.alignment())
                .max()
                .unwrap_or(1)
                .max(1)
        } else {
            1
        };
        let itemsize = match self.itemsize {
            Some(itemsize) => itemsize,
            None => self
                .cursor
                .checked_next_multiple_of(alignment)
                .ok_or(ArrayError::Memory { bytes: usize::MAX })?,
        };

        for field in &self.fields {
            let end = field.offset.checked_add(field.descr.itemsize());
            if end.is_none_or(|end| end > itemsize) {
                return Err(ArrayError::FieldOutOfRange {
                    offset: field.offset,
                    field_size: field.descr.itemsize(),
                    itemsize,
                });
            }
        }
        if itemsize == 0 {
            return Err(ArrayError::ZeroItemSize);
        }

        Ok(Arc::new(Descr::new_record(
            Fields::from_entries(self.fields),
            itemsize,
            alignment,
        )))
    }
}
