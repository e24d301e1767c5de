//! GRIB2 message codec and grid transforms.
//!
//! Parses GRIB2 byte streams into section metadata and unpacks the data
//! field through simple packing, complex packing (with optional spatial
//! differencing) or an injected external compressor; packs fields back into
//! conformant messages; and resamples reduced Gaussian grids onto full
//! regular ones.
//!
//! The crate never performs I/O of its own: the host hands in a complete
//! byte buffer and receives one back.

pub mod codecs;
pub mod error;
pub mod message;
pub mod regrid;
pub mod sections;
pub mod templates;
mod utils;

pub use codecs::{CodecRegistry, FieldCodec};
pub use error::{GribError, Result};
pub use message::{Grib, Message, MessageScan};
pub use sections::sect7::{pack_values, PackingSpec};

#[macro_export]
macro_rules! read_as {
    ($ty:ty, $buf:expr, $start:expr) => {{
        let end = $start + std::mem::size_of::<$ty>();
        <$ty>::from_be_bytes($buf[$start..end].try_into().unwrap())
    }};
}
