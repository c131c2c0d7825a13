//! Temporary well-behaved stand-ins that write back to their source

use super::{Array, ArrayFlags, Base, FlagsUpdate};
use crate::cast::{has_cast_path, write_back};
use crate::error::{ArrayError, Result};
use crate::layout::Order;
use crate::types::Descr;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tracing::{debug, warn};

/// Contiguous, aligned, writeable array standing in for another one
///
/// When the source already qualifies this is a plain view. Otherwise it is a
/// copy flagged `UPDATEIFCOPY`: the source is read-only while the copy is
/// alive, and the copy's contents are cast back into it on [`resolve`],
/// when the flag is cleared through [`set_flags`], or on drop.
///
/// [`resolve`]: UpdateIfCopy::resolve
/// [`set_flags`]: UpdateIfCopy::set_flags
pub struct UpdateIfCopy<'a> {
    target: &'a mut Array,
    array: Array,
    pending: bool,
}

impl Array {
    /// Behaved stand-in for this array, optionally converted to `descr`
    pub fn as_behaved_mut(
        &mut self,
        descr: Option<Arc<Descr>>,
        order: Order,
    ) -> Result<UpdateIfCopy<'_>> {
        let descr = descr.unwrap_or_else(|| Arc::clone(&self.descr));
        let order = match self.resolve_order(order) {
            Order::Keep => Order::C,
            order => order,
        };
        let behaved = self.flags.contains(ArrayFlags::BEHAVED) && self.is_contiguous(order);
        if behaved && descr.equivalent(&self.descr) {
            let array = self.view();
            return Ok(UpdateIfCopy {
                target: self,
                array,
                pending: false,
            });
        }

        self.ensure_writeable()?;
        if !has_cast_path(&descr, &self.descr) {
            return Err(ArrayError::NoCastPath {
                from: descr.to_string(),
                to: self.descr.to_string(),
            });
        }
        let mut array = self.astype(descr, order)?;
        array.flags.insert(ArrayFlags::UPDATEIFCOPY);
        self.set_writeable(false);
        array.base = Some(Base::Array(Arc::new(self.shallow())));
        debug!(shape = ?self.shape(), descr = %array.descr, "created update-if-copy stand-in");
        Ok(UpdateIfCopy {
            target: self,
            array,
            pending: true,
        })
    }
}

impl UpdateIfCopy<'_> {
    /// Whether writes go to a copy that still has to be flushed
    pub fn is_copy(&self) -> bool {
        self.pending
    }

    /// The array being stood in for
    pub fn target(&self) -> &Array {
        &*self.target
    }

    /// Apply flag changes to the stand-in; clearing update-if-copy flushes it now
    pub fn set_flags(&mut self, update: FlagsUpdate) -> Result<()> {
        if update.update_if_copy == Some(false) {
            self.flush()?;
        }
        self.array.set_flags(update)
    }

    /// Flush pending writes and release the source
    pub fn resolve(mut self) -> Result<()> {
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        if !self.pending {
            return Ok(());
        }
        self.pending = false;
        self.array.flags.remove(ArrayFlags::UPDATEIFCOPY);
        self.array.base = None;
        debug!(elements = self.array.size(), "writing update-if-copy stand-in back");
        write_back(self.target, &self.array)?;
        self.target.set_writeable(true);
        Ok(())
    }
}

impl Deref for UpdateIfCopy<'_> {
    type Target = Array;

    fn deref(&self) -> &Array {
        &self.array
    }
}

impl DerefMut for UpdateIfCopy<'_> {
    fn deref_mut(&mut self) -> &mut Array {
        &mut self.array
    }
}

impl Drop for UpdateIfCopy<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            warn!(%err, "update-if-copy write-back failed");
        }
    }
}
