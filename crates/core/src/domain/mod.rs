pub mod alert;
pub mod alert_config;
pub mod count;
pub mod inventory;
pub mod organization;
pub mod product;
pub mod recipe;
pub mod sales;
