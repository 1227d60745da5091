pub mod rest;

#[must_use]
pub fn adapter_name() -> &'static str {
    "shrike-adapters"
}
