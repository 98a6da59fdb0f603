mod key;
mod value;

pub use key::{Group, SettingKey};
pub use value::SettingValue;
