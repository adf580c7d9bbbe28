use crate::decode_field::{FieldMetadata, decode_field};
use convert_case::{Case, Casing};
use quote::ToTokens;
use syn::{ItemStruct, LitStr, Path, parse::ParseBuffer};

pub(crate) struct ModelMetadata {
    pub(crate) fields: Vec<FieldMetadata>,
    pub(crate) table: String,
    pub(crate) table_with: Option<Path>,
    pub(crate) item: ItemStruct,
}

pub fn decode_model(item: ItemStruct) -> ModelMetadata {
    let fields = item
        .fields
        .iter()
        .map(decode_field)
        .filter(|v| !v.skip)
        .collect();
    let mut table_with = None;
    let mut table = item.ident.to_string().to_case(Case::Snake);
    if table.starts_with('_') {
        table.remove(0);
    }
    for attr in &item.attrs {
        let meta = &attr.meta;
        if meta.path().is_ident("crud") {
            let Ok(list) = meta.require_list() else {
                panic!("Error while parsing `crud`, use it like: `#[crud(attribute = value, ..)]`");
            };
            let _ = list.parse_nested_meta(|arg| {
                if arg.path.is_ident("table") {
                    let Ok(value) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                        panic!("Error while parsing `table`, use it like: `#[crud(table = \"my_table\")]`");
                    };
                    table = value.value();
                } else if arg.path.is_ident("table_with") {
                    let Ok(path) = arg
                        .value()
                        .and_then(ParseBuffer::parse::<LitStr>)
                        .and_then(|v| v.parse::<Path>())
                    else {
                        panic!("Error while parsing `table_with`, use it like: `#[crud(table_with = \"my_table_name\")]`");
                    };
                    table_with = Some(path);
                } else {
                    panic!(
                        "Unknown attribute `{}` inside crud macro",
                        arg.path.to_token_stream()
                    );
                }
                Ok(())
            });
        }
    }
    ModelMetadata {
        fields,
        table,
        table_with,
        item,
    }
}
