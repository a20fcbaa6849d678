use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Fields, GenericArgument, PathArguments, Type,
    TypeParamBound,
};

fn is_fn_trait(bound: &TypeParamBound) -> bool {
    if let TypeParamBound::Trait(trait_bound) = bound {
        if let Some(segment) = trait_bound.path.segments.last() {
            let ident = segment.ident.to_string();
            return ident == "FnMut" || ident == "Fn" || ident == "FnOnce";
        }
    }
    false
}

fn first_type_argument(arguments: &PathArguments) -> Option<&Type> {
    if let PathArguments::AngleBracketed(args) = arguments {
        if let Some(GenericArgument::Type(ty)) = args.args.first() {
            return Some(ty);
        }
    }
    None
}

/// Check if a field type is a callback: `fn(..)`, `Box<dyn Fn..>`, `Rc<dyn Fn..>`,
/// `Arc<dyn Fn..>`, or an `Option` of one of those.
fn is_fn_like_type(ty: &Type) -> bool {
    match ty {
        Type::BareFn(_) => true,
        Type::TraitObject(trait_obj) => trait_obj.bounds.iter().any(is_fn_trait),
        Type::Path(type_path) => {
            let Some(segment) = type_path.path.segments.last() else {
                return false;
            };
            let wrapper = segment.ident.to_string();
            if !matches!(wrapper.as_str(), "Box" | "Rc" | "Arc" | "Option") {
                return false;
            }
            first_type_argument(&segment.arguments).is_some_and(is_fn_like_type)
        }
        _ => false,
    }
}

fn is_value_type(ty: &Type) -> bool {
    matches!(ty, Type::Path(type_path)
        if type_path.path.segments.last().is_some_and(|segment| segment.ident == "Value"))
}

/// Nested blueprints are structure, not props.
fn is_element_type(ty: &Type) -> bool {
    let Type::Path(type_path) = ty else {
        return false;
    };
    let Some(segment) = type_path.path.segments.last() else {
        return false;
    };
    if segment.ident == "Element" {
        return true;
    }
    matches!(segment.ident.to_string().as_str(), "Vec" | "Option")
        && first_type_argument(&segment.arguments).is_some_and(is_element_type)
}

fn prop_skipped(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut skip = false;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("prop")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("unsupported prop attribute"))
            }
        })?;
    }
    Ok(skip)
}

fn slot_name(ident: &syn::Ident) -> String {
    let name = ident.to_string();
    name.strip_prefix("r#").map(str::to_owned).unwrap_or(name)
}

/// Implements `chatui_core::PropSource`: every field becomes a prop, except callbacks,
/// nested `Element`s and fields marked `#[prop(skip)]`.
#[proc_macro_derive(Props, attributes(prop))]
pub fn derive_props(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_props(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_props(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Props can only be derived for structs",
        ));
    };

    let mut inserts = Vec::new();
    for (index, field) in data.fields.iter().enumerate() {
        if prop_skipped(&field.attrs)? || is_fn_like_type(&field.ty) || is_element_type(&field.ty)
        {
            continue;
        }
        let (name, access) = match &field.ident {
            Some(ident) => (slot_name(ident), quote! { #ident }),
            None => {
                let index = syn::Index::from(index);
                (index.index.to_string(), quote! { #index })
            }
        };
        // `Value` fields are stored as they are instead of being wrapped again.
        let value = if is_value_type(&field.ty) {
            quote! { ::core::clone::Clone::clone(&self.#access) }
        } else {
            quote! { chatui_core::Value::new(::core::clone::Clone::clone(&self.#access)) }
        };
        inserts.push(quote! {
            __props.insert(#name, #value);
        });
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics chatui_core::PropSource for #ident #ty_generics #where_clause {
            fn to_props(&self) -> chatui_core::Props {
                #[allow(unused_mut)]
                let mut __props = chatui_core::Props::new();
                #(#inserts)*
                __props
            }
        }
    })
}

/// Generates typed slot accessors for a plain state struct.
///
/// For `struct Counter { count: i32 }` this emits `Counter::install(self, store)` (creates
/// missing slots from the struct's values), `Counter::handle(store)` and a `CounterHandle`
/// with `count()` / `set_count(value)` pairs plus `snapshot()`.
#[proc_macro_derive(Reactive)]
pub fn derive_reactive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_reactive(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_reactive(input: &DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Reactive state structs cannot be generic",
        ));
    }
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Reactive requires named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Reactive can only be derived for structs",
            ))
        }
    };

    let ident = &input.ident;
    let vis = &input.vis;
    let handle = format_ident!("{}Handle", ident);

    let mut installs = Vec::new();
    let mut accessors = Vec::new();
    let mut snapshot_fields = Vec::new();
    for field in fields {
        let Some(field_ident) = &field.ident else {
            continue;
        };
        let ty = &field.ty;
        let name = slot_name(field_ident);
        let setter = format_ident!("set_{}", name);

        installs.push(quote! {
            if !store.contains(&chatui_core::SlotKey::state(#name)) {
                store.set(#name, self.#field_ident);
            }
        });
        accessors.push(quote! {
            #vis fn #field_ident(&self) -> ::core::result::Result<#ty, chatui_core::ReactiveError> {
                self.store.get::<#ty>(#name)
            }

            #vis fn #setter(&self, value: #ty) -> bool {
                self.store.set(#name, value)
            }
        });
        snapshot_fields.push(quote! { #field_ident: self.#field_ident()? });
    }

    Ok(quote! {
        #[allow(dead_code)]
        impl #ident {
            /// Creates every missing slot in `store` from this value.
            #vis fn install(self, store: &chatui_core::ReactiveStore) {
                #(#installs)*
            }

            #vis fn handle(store: &chatui_core::ReactiveStore) -> #handle<'_> {
                #handle { store }
            }
        }

        #[derive(Clone, Copy)]
        #vis struct #handle<'a> {
            store: &'a chatui_core::ReactiveStore,
        }

        #[allow(dead_code)]
        impl<'a> #handle<'a> {
            #(#accessors)*

            #vis fn snapshot(&self) -> ::core::result::Result<#ident, chatui_core::ReactiveError> {
                ::core::result::Result::Ok(#ident {
                    #(#snapshot_fields,)*
                })
            }
        }
    })
}
