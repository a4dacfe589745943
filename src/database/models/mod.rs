pub mod alm_setting;

pub use alm_setting::{Alm, AlmSetting};
