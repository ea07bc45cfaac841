pub mod error;
pub mod labels;
pub mod metrics;
pub mod model;
pub mod months;
pub mod number;
pub mod rows;
pub mod selector;
pub mod table;
pub mod transformer;
pub mod version;
pub mod workbook;

pub use error::BalanceError;
pub use model::{EnergySeries, Month, MonthlyValues, ParseResult, SalesSeries};
pub use number::parse_number;
pub use transformer::{BalanceTransformer, DEFAULT_SOURCE_ID};
pub use version::{score, VersionMarker};
pub use workbook::{CellValue, Sheet, Workbook};
