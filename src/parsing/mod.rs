pub mod cycle_check;
pub mod prov_json;
