pub mod canonical;
pub mod error;
pub mod ident;
pub mod links;
pub mod record;
pub mod warc;

pub use canonical::{ResolvedUrl, canonicalize};
pub use error::ScanError;
pub use ident::{IdDeriver, NodeId, derive_id};
pub use links::LinkExtractor;
pub use record::CaptureRecord;
pub use warc::WarcReader;
