//! Array flag bits and the rules for changing them

use super::Array;
use crate::error::{ArrayError, Result};
use bitflags::bitflags;
use tracing::trace;

bitflags! {
    /// State bits of an [`Array`]
    ///
    /// Contiguity and alignment are derived from the layout and recomputed
    /// whenever it changes. `WRITEABLE` and `ALIGNED` can be cleared freely
    /// and only set when the layout allows it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ArrayFlags: u32 {
        const C_CONTIGUOUS = 0x0001;
        const F_CONTIGUOUS = 0x0002;
        const OWNDATA = 0x0004;
        const ALIGNED = 0x0100;
        const WRITEABLE = 0x0400;
        /// Temporary copy that writes back to its base when released
        const UPDATEIFCOPY = 0x1000;

        const BEHAVED = Self::ALIGNED.bits() | Self::WRITEABLE.bits();
        const CARRAY = Self::C_CONTIGUOUS.bits() | Self::BEHAVED.bits();
    }
}

/// Requested flag changes; `None` leaves a flag alone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagsUpdate {
    pub writeable: Option<bool>,
    pub aligned: Option<bool>,
    pub update_if_copy: Option<bool>,
}

impl FlagsUpdate {
    pub fn writeable(value: bool) -> Self {
        Self {
            writeable: Some(value),
            ..Self::default()
        }
    }

    pub fn aligned(value: bool) -> Self {
        Self {
            aligned: Some(value),
            ..Self::default()
        }
    }

    pub fn update_if_copy(value: bool) -> Self {
        Self {
            update_if_copy: Some(value),
            ..Self::default()
        }
    }
}

impl Array {
    /// Apply `update`, all or nothing
    ///
    /// Requests are checked in the order update-if-copy, aligned, writeable;
    /// the first failure leaves every flag as it was.
    pub fn set_flags(&mut self, update: FlagsUpdate) -> Result<()> {
        let mut flags = self.flags;
        match update.update_if_copy {
            Some(true) => return Err(ArrayError::Flags("cannot set UPDATEIFCOPY flag to True")),
            Some(false) => flags.remove(ArrayFlags::UPDATEIFCOPY),
            None => {}
        }
        match update.aligned {
            Some(true) if !self.check_aligned() => {
                return Err(ArrayError::Flags(
                    "cannot set aligned flag of mis-aligned array to True",
                ));
            }
            Some(value) => flags.set(ArrayFlags::ALIGNED, value),
            None => {}
        }
        match update.writeable {
            Some(true) if !self.storage_writeable() => {
                return Err(ArrayError::Flags(
                    "cannot set WRITEABLE flag to True of this array",
                ));
            }
            Some(value) => flags.set(ArrayFlags::WRITEABLE, value),
            None => {}
        }
        trace!(from = ?self.flags, to = ?flags, "flags updated");
        self.flags = flags;
        self.set_writeable(flags.contains(ArrayFlags::WRITEABLE));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::layout::Order;
    use crate::types::{Descr, Item, TypeTag};
    use bytes::Bytes;

    fn ints() -> Array {
        Array::new(Descr::builtin(TypeTag::Int32), &[4], Order::C).unwrap()
    }

    #[test]
    fn writeable_round_trip_on_owned_data() {
        let mut a = ints();
        a.set_flags(FlagsUpdate::writeable(false)).unwrap();
        assert!(!a.is_writeable());
        a.set_flags(FlagsUpdate::writeable(true)).unwrap();
        assert!(a.is_writeable());
    }

    #[test]
    fn views_of_read_only_arrays_stay_read_only() {
        let mut a = ints();
        a.set_flags(FlagsUpdate::writeable(false)).unwrap();
        let mut v = a.view();
        assert!(!v.is_writeable());
        let err = v.set_flags(FlagsUpdate::writeable(true)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);
    }

    #[test]
    fn views_follow_the_owner_turning_read_only() {
        let mut a = ints();
        let mut v = a.view();
        let mut w = v.view();
        v.set_flags(FlagsUpdate::writeable(false)).unwrap();
        a.set_flags(FlagsUpdate::writeable(false)).unwrap();

        let err = v.set_flags(FlagsUpdate::writeable(true)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);
        assert!(!v.is_writeable());
        assert!(matches!(
            v.item_set(&[0], &Item::Int(1)),
            Err(ArrayError::ReadOnly)
        ));
        w.set_flags(FlagsUpdate::writeable(false)).unwrap();
        assert!(w.set_flags(FlagsUpdate::writeable(true)).is_err());

        a.set_flags(FlagsUpdate::writeable(true)).unwrap();
        v.set_flags(FlagsUpdate::writeable(true)).unwrap();
        v.item_set(&[0], &Item::Int(5)).unwrap();
        assert_eq!(a.item(&[0]).unwrap(), Item::Int(5));
    }

    #[test]
    fn borrowed_bytes_never_become_writeable() {
        let mut a = Array::from_bytes(
            Descr::builtin(TypeTag::UInt8),
            &[3],
            None,
            Bytes::from_static(b"abc"),
        )
        .unwrap();
        assert!(a.set_flags(FlagsUpdate::writeable(true)).is_err());
        assert!(!a.is_writeable());
    }

    #[test]
    fn alignment_is_checked_before_setting() {
        let mut a = Array::from_bytes(
            Descr::builtin(TypeTag::UInt8),
            &[8],
            None,
            Bytes::from(vec![0u8; 8]),
        )
        .unwrap();
        let mut odd = a.view_as(Descr::void(2)).unwrap();
        odd.set_flags(FlagsUpdate::aligned(false)).unwrap();
        assert!(!odd.is_aligned());
        odd.set_flags(FlagsUpdate::aligned(true)).unwrap();
        assert!(odd.is_aligned());

        let mut misaligned = Array::with_strides(Descr::builtin(TypeTag::Int32), &[2], &[5]).unwrap();
        assert!(!misaligned.is_aligned());
        assert!(misaligned.set_flags(FlagsUpdate::aligned(true)).is_err());
        a.set_flags(FlagsUpdate::aligned(true)).unwrap();
    }

    #[test]
    fn update_if_copy_cannot_be_requested() {
        let mut a = ints();
        let update = FlagsUpdate {
            writeable: Some(false),
            update_if_copy: Some(true),
            ..FlagsUpdate::default()
        };
        assert!(matches!(a.set_flags(update), Err(ArrayError::Flags(_))));
        assert!(a.is_writeable());
        a.set_flags(FlagsUpdate::update_if_copy(false)).unwrap();
    }
}
