//! # Internal Macros
//!
//! This module provides internal macros for reducing boilerplate in RowDB.
//!
//! ## zerocopy_accessors!
//!
//! Generates getter and setter methods for zerocopy struct fields that use
//! big-endian wrapper types (I32, I64, U32).
//!
//! ### Usage
//!
//! ```ignore
//! use zerocopy::big_endian::{I32, I64};
//!
//! #[repr(C)]
//! struct Header {
//!     root: I64,
//!     block_size: I32,
//! }
//!
//! impl Header {
//!     zerocopy_accessors! {
//!         root: i64,
//!         block_size: i32,
//!     }
//! }
//!
//! // Generates:
//! // pub fn root(&self) -> i64 { self.root.get() }
//! // pub fn set_root(&mut self, val: i64) { self.root = I64::new(val); }
//! // pub fn block_size(&self) -> i32 { self.block_size.get() }
//! // pub fn set_block_size(&mut self, val: i32) { self.block_size = I32::new(val); }
//! ```

/// Generates getter and setter methods for zerocopy big-endian fields.
#[macro_export]
macro_rules! zerocopy_accessors {
    (@impl $field:ident, i32) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> i32 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: i32) {
                self.$field = ::zerocopy::big_endian::I32::new(val);
            }
        }
    };
    (@impl $field:ident, i64) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> i64 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: i64) {
                self.$field = ::zerocopy::big_endian::I64::new(val);
            }
        }
    };
    (@impl $field:ident, u32) => {
        ::paste::paste! {
            #[inline]
            pub fn $field(&self) -> u32 {
                self.$field.get()
            }

            #[inline]
            pub fn [<set_ $field>](&mut self, val: u32) {
                self.$field = ::zerocopy::big_endian::U32::new(val);
            }
        }
    };
    ($($field:ident : $ty:tt),* $(,)?) => {
        $(
            $crate::zerocopy_accessors!(@impl $field, $ty);
        )*
    };
}
