extern crate proc_macro;

use proc_macro::TokenStream;

mod define_field_names;

/// Adds one `pub const FIELD: &str` per named field, holding the key the
/// field has on the wire. `#[serde(rename_all = ...)]` on the struct and
/// `#[serde(rename = ...)]` on a field are honoured.
#[proc_macro_attribute]
pub fn define_field_names(attr: TokenStream, item: TokenStream) -> TokenStream {
    define_field_names::expand(attr, item)
}
