//! Big-endian integer reads.
//!
//! Every multi-byte integer in a table file is stored big-endian. All reads go
//! through [`read_be`] or a [`ByteReader`] over one record, so offsets are
//! bounds-checked in a single place.

/// Fixed-width integers that can be decoded from big-endian bytes.
pub trait BigEndian: Sized + Copy {
    /// Encoded width in bytes.
    const SIZE: usize;

    /// Decode from exactly `Self::SIZE` bytes.
    fn from_be_slice(bytes: &[u8]) -> Self;
}

macro_rules! impl_big_endian {
    ($($ty:ty),* $(,)?) => {
        $(
            impl BigEndian for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn from_be_slice(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_be_bytes(buf)
                }
            }
        )*
    };
}

impl_big_endian!(u8, u16, u32);

/// Read a big-endian `T` at `offset`, or `None` if it would overrun `data`.
pub fn read_be<T: BigEndian>(data: &[u8], offset: usize) -> Option<T> {
    let end = offset.checked_add(T::SIZE)?;
    data.get(offset..end).map(T::from_be_slice)
}

/// Sequential reader over a packed record.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Start reading at `offset`.
    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self { data, pos: offset }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn read<T: BigEndian>(&mut self) -> Option<T> {
        let value = read_be::<T>(self.data, self.pos)?;
        self.pos += T::SIZE;
        Some(value)
    }

    pub fn u8(&mut self) -> Option<u8> {
        self.read()
    }

    pub fn u16(&mut self) -> Option<u16> {
        self.read()
    }

    pub fn u32(&mut self) -> Option<u32> {
        self.read()
    }

    /// Borrow the next `len` bytes.
    pub fn take(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let bytes = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    /// Copy the next `N` bytes into an array.
    pub fn array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Some(buf)
    }

    pub fn skip(&mut self, len: usize) -> Option<()> {
        self.take(len).map(|_| ())
    }
}
