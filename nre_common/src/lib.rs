mod money;

pub mod op;

pub use money::{Cents, CentsConversionError, ZAR_CURRENCY_CODE, ZAR_CURRENCY_CODE_LOWER};
