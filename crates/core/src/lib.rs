pub mod amount;
pub mod record;

pub use amount::{Amount, AmountError};
pub use record::{LineItemRecord, ResultSet, SummaryRecord};
