//! Procedural macros for model-filter
//!
//! This crate provides the attribute that turns a plain `impl` block into a
//! model filter:
//!
//! - `#[model_filter]` - Generate the `ModelFilter` handler table

use convert_case::{Case, Casing};
use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::parse::Parse;
use syn::{Ident, ImplItem, ItemImpl, LitBool, LitStr, Path, Token, parse_macro_input};

/// Generate a `ModelFilter` implementation from the methods of an impl block.
///
/// # Usage
///
/// ```ignore
/// struct UserFilter;
///
/// #[model_filter(model = User, blacklist = ["secret"])]
/// impl UserFilter {
///     fn username(&self, query: &mut ModelQuery<User>, value: &FilterValue) -> anyhow::Result<()> {
///         query.where_like("username", format!("%{}%", value));
///         Ok(())
///     }
///
///     fn setup(&self, query: &mut ModelQuery<User>) -> anyhow::Result<()> {
///         query.where_null("deleted_at");
///         Ok(())
///     }
///
///     #[skip_filter]
///     fn helper(&self, a: u8, b: u8) -> u8 { a + b }
/// }
/// ```
///
/// Every method taking `&self` plus two arguments becomes a handler,
/// registered under the camelCase form of its name (`is_admin` → `isAdmin`)
/// unless `camel_case = false`. A `setup(&self, query)` method becomes the
/// setup hook. Methods marked `#[skip_filter]` are left alone.
///
/// # Options
///
/// - `model = Path` (required) - the model the filter applies to
/// - `blacklist = ["name", ...]` - handlers that are never dispatched to, by
///   method name or filter name; each entry must name a handler
/// - `drop_id = bool` - retry without an `Id` suffix (default true)
/// - `camel_case = bool` - camelCase input keys before lookup (default true)
#[proc_macro_attribute]
pub fn model_filter(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut options = FilterOptions::default();
    let parser = syn::meta::parser(|meta| options.parse(meta));
    parse_macro_input!(args with parser);

    let item = parse_macro_input!(input as ItemImpl);

    match expand(options, item) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Arguments of `#[model_filter(...)]`
#[derive(Default)]
struct FilterOptions {
    model: Option<Path>,
    blacklist: Vec<LitStr>,
    drop_id: Option<LitBool>,
    camel_case: Option<LitBool>,
}

impl FilterOptions {
    fn parse(&mut self, meta: ParseNestedMeta) -> syn::Result<()> {
        if meta.path.is_ident("model") {
            self.model = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("blacklist") {
            let value = meta.value()?;
            let content;
            syn::bracketed!(content in value);
            let names = content.parse_terminated(<LitStr as Parse>::parse, Token![,])?;
            self.blacklist.extend(names);
        } else if meta.path.is_ident("drop_id") {
            self.drop_id = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("camel_case") {
            self.camel_case = Some(meta.value()?.parse()?);
        } else {
            return Err(meta.error("expected `model`, `blacklist`, `drop_id` or `camel_case`"));
        }
        Ok(())
    }
}

fn expand(options: FilterOptions, mut item: ItemImpl) -> syn::Result<TokenStream2> {
    let model = options.model.ok_or_else(|| {
        syn::Error::new(
            Span::call_site(),
            "missing model, use #[model_filter(model = MyModel)]",
        )
    })?;

    let camel_case = options.camel_case.as_ref().map_or(true, |lit| lit.value);

    let mut handler_names: Vec<LitStr> = Vec::new();
    let mut handler_fns: Vec<Ident> = Vec::new();
    let mut setup_fn: Option<Ident> = None;

    for impl_item in &mut item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };

        let attr_count = method.attrs.len();
        method.attrs.retain(|attr| !attr.path().is_ident("skip_filter"));
        if method.attrs.len() != attr_count || method.sig.receiver().is_none() {
            continue;
        }

        let ident = method.sig.ident.clone();
        match method.sig.inputs.len() {
            2 if ident == "setup" => setup_fn = Some(ident),
            3 => {
                let raw = ident.unraw().to_string();
                let name = if camel_case {
                    raw.to_case(Case::Camel)
                } else {
                    raw
                };

                if handler_names.iter().any(|existing| existing.value() == name) {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("two handlers resolve to the filter name '{}'", name),
                    ));
                }

                handler_names.push(LitStr::new(&name, ident.span()));
                handler_fns.push(ident);
            }
            _ => {}
        }
    }

    let self_ty = &item.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();

    let has_handler = if handler_names.is_empty() {
        quote!(false)
    } else {
        quote!(matches!(name, #(#handler_names)|*))
    };

    let setup = setup_fn.map(|ident| {
        quote! {
            fn setup(
                &self,
                query: &mut ::model_filter::ModelQuery<#model>,
            ) -> ::model_filter::Result<()> {
                <#self_ty>::#ident(self, query)
                    .map_err(|err| ::model_filter::Error::Handler(err.into()))
            }
        }
    });

    let blacklist = resolve_blacklist(&options.blacklist, &handler_names, camel_case)?;
    let is_blacklisted = (!blacklist.is_empty()).then(|| {
        quote! {
            fn is_blacklisted(&self, name: &str) -> bool {
                matches!(name, #(#blacklist)|*)
            }
        }
    });

    let drop_id = options.drop_id.map(|lit| {
        quote! {
            fn drop_id(&self) -> bool {
                #lit
            }
        }
    });

    let camel_case_fn = options.camel_case.map(|lit| {
        quote! {
            fn camel_case(&self) -> bool {
                #lit
            }
        }
    });

    let output = quote! {
        #item

        impl #impl_generics ::model_filter::ModelFilter<#model> for #self_ty #where_clause {
            #[allow(unused_variables)]
            fn has_handler(&self, name: &str) -> bool {
                #has_handler
            }

            #[allow(unused_variables)]
            fn invoke(
                &self,
                name: &str,
                query: &mut ::model_filter::ModelQuery<#model>,
                value: &::model_filter::FilterValue,
            ) -> ::model_filter::Result<()> {
                match name {
                    #(
                        #handler_names => <#self_ty>::#handler_fns(self, query, value)
                            .map_err(|err| ::model_filter::Error::Handler(err.into())),
                    )*
                    _ => Err(::model_filter::Error::UnknownHandler {
                        name: name.to_string(),
                    }),
                }
            }

            #setup
            #is_blacklisted
            #drop_id
            #camel_case_fn
        }
    };

    Ok(output)
}

/// Map blacklist entries onto registered handler names.
fn resolve_blacklist(
    entries: &[LitStr],
    handler_names: &[LitStr],
    camel_case: bool,
) -> syn::Result<Vec<LitStr>> {
    entries
        .iter()
        .map(|entry| {
            let name = if camel_case {
                entry.value().to_case(Case::Camel)
            } else {
                entry.value()
            };

            if !handler_names.iter().any(|handler| handler.value() == name) {
                return Err(syn::Error::new(
                    entry.span(),
                    format!("blacklist entry '{}' names no handler", entry.value()),
                ));
            }

            Ok(LitStr::new(&name, entry.span()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn options(blacklist: &[&str], camel_case: bool) -> FilterOptions {
        FilterOptions {
            model: Some(parse_quote!(Account)),
            blacklist: blacklist
                .iter()
                .map(|name| LitStr::new(name, Span::call_site()))
                .collect(),
            drop_id: None,
            camel_case: Some(LitBool::new(camel_case, Span::call_site())),
        }
    }

    fn filter_impl() -> ItemImpl {
        parse_quote! {
            impl AccountFilter {
                fn secret_method(&self, query: &mut Q, value: &V) -> anyhow::Result<()> {
                    Ok(())
                }

                fn username(&self, query: &mut Q, value: &V) -> anyhow::Result<()> {
                    Ok(())
                }
            }
        }
    }

    fn blacklist_of(output: &TokenStream2) -> String {
        let text = output.to_string();
        let start = text.find("fn is_blacklisted").expect("is_blacklisted generated");
        text[start..].to_string()
    }

    #[test]
    fn test_blacklist_accepts_method_names() {
        let output = expand(options(&["secret_method"], true), filter_impl()).unwrap();
        let blacklist = blacklist_of(&output);

        assert!(blacklist.contains("\"secretMethod\""));
        assert!(!blacklist.contains("\"secret_method\""));
    }

    #[test]
    fn test_blacklist_accepts_filter_names() {
        let output = expand(options(&["secretMethod"], true), filter_impl()).unwrap();
        assert!(blacklist_of(&output).contains("\"secretMethod\""));
    }

    #[test]
    fn test_blacklist_keeps_raw_names_without_camel_case() {
        let output = expand(options(&["secret_method"], false), filter_impl()).unwrap();
        assert!(blacklist_of(&output).contains("\"secret_method\""));
    }

    #[test]
    fn test_blacklist_entry_without_handler_is_rejected() {
        let err = expand(options(&["password"], true), filter_impl()).unwrap_err();
        assert_eq!(err.to_string(), "blacklist entry 'password' names no handler");
    }

    #[test]
    fn test_duplicate_filter_names_are_rejected() {
        let item: ItemImpl = parse_quote! {
            impl AccountFilter {
                fn is_admin(&self, query: &mut Q, value: &V) -> anyhow::Result<()> { Ok(()) }
                fn isAdmin(&self, query: &mut Q, value: &V) -> anyhow::Result<()> { Ok(()) }
            }
        };

        let err = expand(options(&[], true), item).unwrap_err();
        assert_eq!(err.to_string(), "two handlers resolve to the filter name 'isAdmin'");
    }
}
