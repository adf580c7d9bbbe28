mod decode_dests;
mod decode_field;
mod decode_model;

use decode_dests::{DestKind, decode_dests};
use decode_model::decode_model;
use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};

/// Derive the field table, the introspection subject and the scanning
/// support of a struct.
///
/// Struct attributes: `#[crud(table = "users")]`, the snake case struct name
/// otherwise, or `#[crud(table_with = "path::to_fn")]` to compute the table of
/// every value with a `fn(&Self) -> String`. Field attributes:
/// `#[crud(name = "..", cmp = "..", filter = "..", join = "..", conv = "..",
/// skip)]`. A field with `join` is a nested predicate group, its type must
/// derive `Model` too.
///
/// The struct must implement `Default` and `Clone`.
#[proc_macro_derive(Model, attributes(crud))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    let metadata = decode_model(item);
    let item = &metadata.item;
    let name = &item.ident;
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();
    let table = &metadata.table;
    let count = metadata.fields.len();
    let defs = metadata.fields.iter().map(|field| {
        let ident = field.ident.to_string();
        let column = &field.column;
        let nullable = field.nullable;
        let cmp = &field.cmp;
        let join = &field.join;
        let filter = &field.filter;
        let conv = &field.conv;
        quote! {
            ::crud::FieldDef {
                ident: #ident,
                column: #column,
                nullable: #nullable,
                cmp: #cmp,
                join: #join,
                filter: #filter,
                conv: #conv,
            }
        }
    });
    let values = metadata.fields.iter().enumerate().map(|(i, field)| {
        let ident = &field.ident;
        if field.nested() {
            quote!(#i => ::crud::FieldRef::Nested(&self.#ident))
        } else {
            quote! {
                #i => ::crud::FieldRef::Value(
                    ::crud::AsValue::as_value(::std::clone::Clone::clone(&self.#ident))
                )
            }
        }
    });
    let assigns = metadata.fields.iter().enumerate().map(|(i, field)| {
        let ident = &field.ident;
        if field.nested() {
            let message = format!(
                "Field `{}` of `{}` is a nested group and cannot be assigned",
                ident, name
            );
            quote!(#i => return Err(::crud::Error::msg(#message)))
        } else {
            quote!(#i => self.#ident = ::crud::AsValue::try_from_value(value)?)
        }
    });
    let name_str = name.to_string();
    let table = match &metadata.table_with {
        Some(path) => quote!(::std::borrow::Cow::Owned(#path(self))),
        None => quote!(::std::borrow::Cow::Borrowed(#table)),
    };
    quote! {
        impl #impl_generics ::crud::Fields for #name #ty_generics #where_clause {
            fn table(&self) -> ::std::borrow::Cow<'_, str> {
                #table
            }
            fn field_defs(&self) -> &'static [::crud::FieldDef] {
                static FIELDS: [::crud::FieldDef; #count] = [#(#defs),*];
                &FIELDS
            }
            fn field(&self, index: usize) -> ::crud::FieldRef<'_> {
                match index {
                    #(#values,)*
                    _ => panic!("Field index {} is out of range for `{}`", index, #name_str),
                }
            }
        }

        impl #impl_generics ::crud::AsSubject for #name #ty_generics #where_clause {
            fn subject(&self) -> ::crud::Subject<'_> {
                ::crud::Subject::Model(self)
            }
        }

        impl #impl_generics ::crud::Model for #name #ty_generics #where_clause {
            fn new_like(&self) -> Self {
                ::std::default::Default::default()
            }
            fn assign(&mut self, index: usize, value: ::crud::Value) -> ::crud::Result<()> {
                match index {
                    #(#assigns,)*
                    _ => {
                        return Err(::crud::Error::msg(format!(
                            "Field index {} is out of range for `{}`",
                            index, #name_str
                        )));
                    }
                }
                Ok(())
            }
        }

        impl #impl_generics ::crud::Slot<#name #ty_generics> for #name #ty_generics #where_clause {
            fn make(item: ::crud::Scanned<'_, Self>) -> ::crud::Result<Self> {
                item.whole().cloned()
            }
            fn put(&mut self, item: ::crud::Scanned<'_, Self>) -> ::crud::Result<()> {
                *self = ::std::clone::Clone::clone(item.whole()?);
                Ok(())
            }
        }
    }
    .into()
}

/// Derive `ScanDests` for a struct holding the destinations of a query.
///
/// Struct attribute: `#[crud(model = "MyModel")]`, the scanned model. Without
/// a pattern a `Vec` field collects every row and any other field takes the
/// last one. With `#[crud(scan = "pattern")]` a map field is keyed by the
/// pattern, a list of maps receives one record per row and any other field
/// receives the named column. `#[crud(scan = "-")]` leaves the field out.
#[proc_macro_derive(ScanDests, attributes(crud))]
pub fn derive_scan_dests(input: TokenStream) -> TokenStream {
    let item: ItemStruct = parse_macro_input!(input as ItemStruct);
    let metadata = decode_dests(item);
    let item = &metadata.item;
    let name = &item.ident;
    let model = &metadata.model;
    let (impl_generics, ty_generics, where_clause) = item.generics.split_for_impl();
    let dests = metadata.fields.iter().map(|field| {
        let ident = &field.ident;
        let pattern = &field.pattern;
        match field.kind {
            DestKind::Assign => quote!(::crud::Dest::assign(&mut self.#ident)),
            DestKind::Append => quote!(::crud::Dest::append(&mut self.#ident)),
            DestKind::Map => quote!(::crud::Dest::map(&mut self.#ident, #pattern)),
            DestKind::Maps => quote!(::crud::Dest::maps(&mut self.#ident, #pattern)),
            DestKind::Field => quote!(::crud::Dest::field(&mut self.#ident, #pattern)),
        }
    });
    quote! {
        impl #impl_generics ::crud::ScanDests<#model> for #name #ty_generics #where_clause {
            fn dests(&mut self) -> ::std::vec::Vec<::crud::Dest<'_, #model>> {
                ::std::vec![#(#dests),*]
            }
        }
    }
    .into()
}
