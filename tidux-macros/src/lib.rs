//! Procedural macros for tidux

use darling::{FromDeriveInput, FromField};
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Container-level input for #[derive(Selection)]
#[derive(FromDeriveInput)]
#[darling(attributes(selection), supports(struct_any))]
struct SelectionOpts {
    ident: syn::Ident,
    generics: syn::Generics,
    data: darling::ast::Data<(), SelectionField>,
}

/// Field-level attributes
#[derive(FromField)]
#[darling(attributes(selection))]
struct SelectionField {
    ident: Option<syn::Ident>,
    ty: syn::Type,

    /// Leave this field out of change detection
    #[darling(default)]
    skip: bool,
}

/// Derive macro for the Selection trait
///
/// Two values are the same selection when every field is
/// `Identity`-equal: pointer equality for `Arc`/`Rc` fields, value equality
/// for scalars and strings. Fields are never compared recursively.
///
/// # Attributes
///
/// - `#[selection(skip)]`: ignore a field entirely
///
/// # Example
/// ```ignore
/// #[derive(Selection, Clone)]
/// struct TodoView {
///     items: Arc<Vec<Todo>>,
///     filter: String,
///     #[selection(skip)]
///     rendered_at: Instant,
/// }
/// ```
#[proc_macro_derive(Selection, attributes(selection))]
pub fn derive_selection(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match SelectionOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;

    let fields = match &opts.data {
        darling::ast::Data::Struct(fields) => fields,
        _ => {
            return syn::Error::new_spanned(&input, "Selection can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    let compared: Vec<_> = fields
        .fields
        .iter()
        .enumerate()
        .filter(|(_, f)| !f.skip)
        .collect();

    let comparisons = compared.iter().map(|(index, field)| {
        let access = match &field.ident {
            Some(ident) => quote! { #ident },
            None => {
                let index = syn::Index::from(*index);
                quote! { #index }
            }
        };
        quote! {
            tidux::Identity::is_identical(&self.#access, &other.#access)
        }
    });

    let bounds = compared.iter().map(|(_, field)| {
        let ty = &field.ty;
        quote! { #ty: tidux::Identity }
    });

    let (impl_generics, ty_generics, where_clause) = opts.generics.split_for_impl();
    let mut predicates: Vec<_> = where_clause
        .map(|w| w.predicates.iter().map(|p| quote! { #p }).collect())
        .unwrap_or_default();
    predicates.extend(bounds);

    let expanded = quote! {
        impl #impl_generics tidux::Selection for #name #ty_generics
        where
            #(#predicates,)*
        {
            #[allow(unused_variables)]
            fn same_as(&self, other: &Self) -> bool {
                true #(&& #comparisons)*
            }
        }
    };

    TokenStream::from(expanded)
}
