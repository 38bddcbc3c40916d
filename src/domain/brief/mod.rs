//! Campaign brief - the schema being filled, its data record and the
//! phases a turn goes through while filling it.

mod data;
mod fields;
mod payload;
mod phase;

pub use data::{is_blank, BriefData};
pub use fields::{BriefField, UnknownField, COMPLETION_FLAG};
pub use payload::{parse_json_payload, strip_code_fences};
pub use phase::ExtractionPhase;
