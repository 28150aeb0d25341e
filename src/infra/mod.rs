pub mod commercetools;
