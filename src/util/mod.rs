//! Stateless helpers
//!
//! Small conversions and parsers shared by the service clients and callers.

pub mod benchmark;
pub mod convert;
pub mod eid;
pub mod listify;
pub mod normalize;
pub mod time;
pub mod truthy;

pub use benchmark::{benchmark, make_msg, Benchmark};
pub use convert::{convert_keys_to_snake_case, to_snake_case};
pub use eid::convert_to_eid;
pub use listify::{listify, Listify};
pub use normalize::{normalize_email, normalize_name_or_place, normalize_phone, normalize_zip};
pub use time::{now_tz, parse_date_for_tz, today_tz};
pub use truthy::{truthy, truthy_with, TRUE_VALUES};
