mod analytics;
mod audit;
mod cash_register;
mod category;
mod imei_serial;
mod import;
mod partner;
mod product;
mod sale;
mod user;
mod validation;

pub use analytics::*;
pub use audit::*;
pub use cash_register::*;
pub use category::*;
pub use imei_serial::*;
pub use import::*;
pub use partner::*;
pub use product::*;
pub use sale::*;
pub use user::*;
pub use validation::*;
