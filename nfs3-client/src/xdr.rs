//! This module implements helper traits for packing and unpacking
//! packets in XDR standard (RFC 4506)
//!
//! Every variable-length read checks the bytes remaining in the buffer
//! before copying, so a hostile length prefix can never cause an allocation
//! larger than the record it arrived in.  The record size itself is capped
//! by the RPC transport.
use bytes::{Buf, BufMut, Bytes};

pub use crate::result::{Result, XdrError};

const PAD_ZERO: [u8; 4] = [0; 4];

/// Number of zero bytes that follow `len` bytes of opaque data
#[inline]
const fn pad_len(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// A trait for packing data in XDR format into a buffer.
pub trait Packer {
    fn pack_uint(&mut self, value: u32);

    fn pack_int(&mut self, value: i32);

    fn pack_uhyper(&mut self, value: u64);

    fn pack_hyper(&mut self, value: i64);

    fn pack_float(&mut self, value: f32);

    fn pack_double(&mut self, value: f64);

    fn pack_bool(&mut self, value: bool);

    fn pack_opaque(&mut self, value: &[u8]);

    fn pack_opaque_fixed(&mut self, value: &[u8]);

    /// Packs the string's bytes as given; callers own validating names
    fn pack_string(&mut self, value: &str);

    fn pack_array<I, F>(&mut self, array: &[I], pack_fn: F)
    where
        F: Fn(&mut Self, &I),
    {
        self.pack_uint(array.len() as u32);
        for item in array {
            pack_fn(self, item);
        }
    }

    /// Packs `items` as XDR optional-data: every item is preceded by
    /// `TRUE` and the list is terminated by `FALSE`.
    fn pack_optional_list<I, F>(&mut self, items: &[I], pack_fn: F)
    where
        F: Fn(&mut Self, &I),
    {
        for item in items {
            self.pack_bool(true);
            pack_fn(self, item);
        }
        self.pack_bool(false);
    }
}

impl<Buffer: BufMut> Packer for Buffer {
    #[inline]
    fn pack_uint(&mut self, value: u32) {
        self.put_u32(value)
    }

    #[inline]
    fn pack_int(&mut self, value: i32) {
        self.put_i32(value)
    }

    #[inline]
    fn pack_uhyper(&mut self, value: u64) {
        self.put_u64(value)
    }

    #[inline]
    fn pack_hyper(&mut self, value: i64) {
        self.put_i64(value)
    }

    #[inline]
    fn pack_float(&mut self, value: f32) {
        self.put_f32(value)
    }

    #[inline]
    fn pack_double(&mut self, value: f64) {
        self.put_f64(value)
    }

    #[inline]
    fn pack_bool(&mut self, value: bool) {
        self.put_u32(value as u32)
    }

    #[inline]
    fn pack_opaque(&mut self, value: &[u8]) {
        self.put_u32(value.len() as u32);
        self.pack_opaque_fixed(value);
    }

    #[inline]
    fn pack_opaque_fixed(&mut self, value: &[u8]) {
        self.put_slice(value);
        self.put_slice(&PAD_ZERO[..pad_len(value.len())])
    }

    #[inline]
    fn pack_string(&mut self, value: &str) {
        self.pack_opaque(value.as_bytes())
    }
}

/// A trait for unpacking XDR from a buffer
pub trait Unpacker {
    fn unpack_uint(&mut self) -> Result<u32>;

    fn unpack_int(&mut self) -> Result<i32>;

    fn unpack_uhyper(&mut self) -> Result<u64>;

    fn unpack_hyper(&mut self) -> Result<i64>;

    fn unpack_float(&mut self) -> Result<f32>;

    fn unpack_double(&mut self) -> Result<f64>;

    #[inline]
    fn unpack_bool(&mut self) -> Result<bool> {
        match self.unpack_uint()? {
            0 => Ok(false),
            1 => Ok(true),
            n => Err(XdrError::InvalidBool(n).into()),
        }
    }

    fn unpack_opaque(&mut self) -> Result<Bytes>;

    /// Unpacks variable-length opaque data whose declared maximum is `max`
    fn unpack_opaque_max(&mut self, max: u32) -> Result<Bytes>;

    fn unpack_opaque_fixed(&mut self, nbytes: usize) -> Result<Bytes>;

    /// Bytes left to decode, used to bound pre-allocation
    fn bytes_left(&self) -> usize;

    fn unpack_vec<I, F>(&mut self, unpack_fn: F) -> Result<Vec<I>>
    where
        F: Fn(&mut Self) -> Result<I>,
    {
        let len = self.unpack_uint()? as usize;
        // every element takes at least one XDR unit
        let mut result = Vec::with_capacity(len.min(self.bytes_left() / 4));
        for _ in 0..len {
            result.push(unpack_fn(self)?);
        }

        Ok(result)
    }

    /// Unpacks XDR optional-data into a list, reading `(TRUE, item)` pairs
    /// until the first `FALSE`.
    fn unpack_optional_list<I, F>(&mut self, unpack_fn: F) -> Result<Vec<I>>
    where
        F: Fn(&mut Self) -> Result<I>,
    {
        let mut result = Vec::new();
        while self.unpack_bool()? {
            result.push(unpack_fn(self)?);
        }

        Ok(result)
    }
}

macro_rules! unpack_impl {
    ($TraitFn:ident, $ResT:ty, $GetFn:ident) => {
        #[inline]
        fn $TraitFn(&mut self) -> Result<$ResT> {
            if self.remaining() >= std::mem::size_of::<$ResT>() {
                Ok(self.$GetFn())
            } else {
                Err(XdrError::NotEnoughData.into())
            }
        }
    };
}

impl<Buffer: Buf> Unpacker for Buffer {
    unpack_impl!(unpack_uint, u32, get_u32);
    unpack_impl!(unpack_int, i32, get_i32);
    unpack_impl!(unpack_uhyper, u64, get_u64);
    unpack_impl!(unpack_hyper, i64, get_i64);
    unpack_impl!(unpack_float, f32, get_f32);
    unpack_impl!(unpack_double, f64, get_f64);

    #[inline]
    fn unpack_opaque(&mut self) -> Result<Bytes> {
        let len = self.unpack_uint()? as usize;
        self.unpack_opaque_fixed(len)
    }

    #[inline]
    fn unpack_opaque_max(&mut self, max: u32) -> Result<Bytes> {
        let len = self.unpack_uint()?;
        if len > max {
            return Err(XdrError::LengthTooLarge { len, max }.into());
        }
        self.unpack_opaque_fixed(len as usize)
    }

    #[inline]
    fn unpack_opaque_fixed(&mut self, nbytes: usize) -> Result<Bytes> {
        let padded = nbytes.checked_add(pad_len(nbytes));
        match padded {
            Some(padded) if self.remaining() >= padded => {
                let ret = self.copy_to_bytes(nbytes);
                self.advance(padded - nbytes);
                Ok(ret)
            }
            _ => Err(XdrError::NotEnoughData.into()),
        }
    }

    #[inline]
    fn bytes_left(&self) -> usize {
        self.remaining()
    }
}

/// Trait that allows packing objects into a buffer.
pub trait PackTo<B> {
    /// Pack `self` into `buf`
    fn pack_to(&self, buf: &mut B);
}

/// Trait that allows unpacking objects from a buffer
pub trait UnpackFrom<B> {
    fn unpack_from(buf: &mut B) -> Result<Self>
    where
        Self: Sized;
}

/// Allow generic `Vec<T>` implementation of `PackTo` and `UnpackFrom` for the type
/// if the traits are implemented for `T`
pub(crate) trait VecPackUnpack {}

macro_rules! impl_pack_to (
    ($type:ty, $method:ident) => {
        impl VecPackUnpack for $type {
        }

        impl<B: Packer> PackTo<B> for $type {
            fn pack_to(&self, buf: &mut B) {
                buf.$method(*self)
            }
        }
    }
);

macro_rules! impl_unpack_from (
    ($type:ty, $method:ident) => {
        impl<B: Unpacker> UnpackFrom<B> for $type {
            fn unpack_from(buf: &mut B) -> Result<Self> {
                buf.$method()
            }
        }
    }
);

// Note: explicitly NOT implemented for u8 to allow trait implementation
// for Vec<u8> and a generic Vec<T>.  XDR does not define encoding for "byte"
// so it would have to be encoded as 4-byte unsigned int which is not what's
// expected for a byte vector.
impl_pack_to!(u32, pack_uint);
impl_pack_to!(i32, pack_int);
impl_pack_to!(u64, pack_uhyper);
impl_pack_to!(i64, pack_hyper);
impl_pack_to!(f32, pack_float);
impl_pack_to!(f64, pack_double);
impl_pack_to!(bool, pack_bool);
impl_pack_to!(&str, pack_string);

impl_unpack_from!(u32, unpack_uint);
impl_unpack_from!(i32, unpack_int);
impl_unpack_from!(u64, unpack_uhyper);
impl_unpack_from!(i64, unpack_hyper);
impl_unpack_from!(f32, unpack_float);
impl_unpack_from!(f64, unpack_double);
impl_unpack_from!(bool, unpack_bool);
impl_unpack_from!(Bytes, unpack_opaque);

// XDR void
impl<B> PackTo<B> for () {
    fn pack_to(&self, _buf: &mut B) {}
}

impl<B> UnpackFrom<B> for () {
    fn unpack_from(_buf: &mut B) -> Result<Self> {
        Ok(())
    }
}

impl<B: Packer> PackTo<B> for String {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_string(self);
    }
}

impl<T: PackTo<B>, B: Packer> PackTo<B> for Option<T> {
    fn pack_to(&self, buf: &mut B) {
        match self {
            Some(t) => {
                buf.pack_bool(true);
                t.pack_to(buf);
            }
            None => {
                buf.pack_bool(false);
            }
        }
    }
}

impl<B: Packer> PackTo<B> for Vec<u8> {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_opaque(self);
    }
}

impl<B: Packer> PackTo<B> for Bytes {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_opaque(self.as_ref());
    }
}

impl<T: VecPackUnpack + PackTo<B>, B: Packer> PackTo<B> for Vec<T> {
    fn pack_to(&self, buf: &mut B) {
        buf.pack_uint(self.len() as u32);
        for item in self.iter() {
            item.pack_to(buf);
        }
    }
}

impl<T: VecPackUnpack + UnpackFrom<B>, B: Unpacker> UnpackFrom<B> for Vec<T> {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        buf.unpack_vec(T::unpack_from)
    }
}

impl<T: UnpackFrom<B>, B: Unpacker> UnpackFrom<B> for Option<T> {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        if buf.unpack_bool()? {
            Ok(Some(T::unpack_from(buf)?))
        } else {
            Ok(None)
        }
    }
}

impl<B: Unpacker> UnpackFrom<B> for Vec<u8> {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        Ok(buf.unpack_opaque()?.to_vec())
    }
}

impl<B: Unpacker> UnpackFrom<B> for String {
    fn unpack_from(buf: &mut B) -> Result<Self> {
        let v = Vec::<u8>::unpack_from(buf)?;
        string_from_bytes(v)
    }
}

/// Converts decoded string bytes.  Names and paths cannot hold NUL on any
/// server, so a NUL means the data is corrupt.
pub fn string_from_bytes(v: Vec<u8>) -> Result<String> {
    if v.contains(&0) {
        return Err(XdrError::EmbeddedNul.into());
    }
    Ok(String::from_utf8(v)?)
}
