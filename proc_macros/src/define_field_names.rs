use heck::{ToKebabCase, ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use proc_macro::TokenStream;
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Ident, ItemStruct, LitStr, Token, parse_macro_input};

pub fn expand(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    let struct_name = &input.ident;

    let rename_all = match serde_attr(&input.attrs, "rename_all") {
        Ok(v) => v,
        Err(e) => return e.to_compile_error().into(),
    };

    let mut consts = Vec::new();
    for field in input.fields.iter() {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let rename = match serde_attr(&field.attrs, "rename") {
            Ok(v) => v,
            Err(e) => return e.to_compile_error().into(),
        };
        let raw = ident.to_string();
        let raw = raw.trim_start_matches("r#");
        let wire = match (rename, rename_all.as_deref()) {
            (Some(explicit), _) => explicit,
            (None, Some(rule)) => match apply_rule(rule, raw) {
                Some(v) => v,
                None => {
                    return syn::Error::new_spanned(
                        struct_name,
                        format!("unsupported rename_all rule `{rule}`"),
                    )
                    .to_compile_error()
                    .into();
                }
            },
            (None, None) => raw.to_string(),
        };
        let const_name = Ident::new(&raw.to_shouty_snake_case(), ident.span());
        consts.push(quote! {
            #[allow(dead_code)]
            pub const #const_name: &'static str = #wire;
        });
    }

    let expanded = quote! {
        #input

        impl #struct_name {
            #(#consts)*
        }
    };

    TokenStream::from(expanded)
}

fn apply_rule(rule: &str, field: &str) -> Option<String> {
    let out = match rule {
        "camelCase" => field.to_lower_camel_case(),
        "snake_case" => field.to_snake_case(),
        "PascalCase" => field.to_upper_camel_case(),
        "kebab-case" => field.to_kebab_case(),
        "SCREAMING_SNAKE_CASE" => field.to_shouty_snake_case(),
        "lowercase" => field.to_lowercase(),
        "UPPERCASE" => field.to_uppercase(),
        _ => return None,
    };
    Some(out)
}

/// Finds `#[serde(<key> = "...")]` among `attrs`.
fn serde_attr(attrs: &[Attribute], key: &str) -> syn::Result<Option<String>> {
    let mut found = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(key) && meta.input.peek(Token![=]) {
                let lit: LitStr = meta.value()?.parse()?;
                found = Some(lit.value());
                Ok(())
            } else {
                skip_meta(&meta)
            }
        })?;
    }
    Ok(found)
}

fn skip_meta(meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        let _content;
        syn::parenthesized!(_content in meta.input);
    }
    Ok(())
}
