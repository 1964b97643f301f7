//! Total cell parsers used by the record mapper.
//!
//! None of these fail: malformed or absent input maps to a documented
//! default (`None`, `false`, `Nenurodyta`, `other`).

mod clinical;
mod datetime;
mod tokens;

pub use clinical::{
    OTHER_GROUP, diagnosis_group, extract_diagnosis_codes, normalize_city, parse_age,
    parse_decimal, parse_referral, parse_sex, primary_diagnosis_group,
};
pub use datetime::{ParsedTimestamp, parse_timestamp};
pub use tokens::{detect_card_type, detect_night, matches_any, matches_wildcard};
