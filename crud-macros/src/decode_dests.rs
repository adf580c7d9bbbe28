use quote::ToTokens;
use syn::{
    Field, GenericArgument, Ident, ItemStruct, LitStr, Path, PathArguments, PathSegment, Type,
    parse::ParseBuffer,
};

pub(crate) enum DestKind {
    Assign,
    Append,
    Map,
    Maps,
    Field,
}

pub(crate) struct DestField {
    pub(crate) ident: Ident,
    pub(crate) kind: DestKind,
    pub(crate) pattern: String,
}

pub(crate) struct DestsMetadata {
    pub(crate) model: Path,
    pub(crate) fields: Vec<DestField>,
    pub(crate) item: ItemStruct,
}

fn last_segment(ty: &Type) -> Option<&PathSegment> {
    let Type::Path(path) = ty else {
        return None;
    };
    path.path.segments.last()
}

fn is_named(ty: &Type, names: &[&str]) -> bool {
    last_segment(ty).is_some_and(|v| names.iter().any(|name| v.ident == *name))
}

fn first_argument(ty: &Type) -> Option<&Type> {
    let PathArguments::AngleBracketed(arguments) = &last_segment(ty)?.arguments else {
        return None;
    };
    arguments.args.iter().find_map(|v| match v {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

fn decode_dest(field: &Field) -> Option<DestField> {
    let ident = field
        .ident
        .clone()
        .expect("Field is expected to have a name");
    let mut pattern = String::new();
    for attr in &field.attrs {
        let meta = &attr.meta;
        if meta.path().is_ident("crud") {
            let Ok(list) = meta.require_list() else {
                panic!("Error while parsing `crud`, use it like: `#[crud(scan = \"pattern\")]`");
            };
            let _ = list.parse_nested_meta(|arg| {
                if arg.path.is_ident("scan") {
                    let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                        panic!("Error while parsing `scan`, use it like: `#[crud(scan = \"tid\")]`");
                    };
                    pattern = v.value();
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
    if pattern.trim() == "-" {
        return None;
    }
    let maps = ["HashMap", "BTreeMap"];
    let kind = if pattern.is_empty() {
        if is_named(&field.ty, &["Vec"]) {
            DestKind::Append
        } else {
            DestKind::Assign
        }
    } else if is_named(&field.ty, &maps) {
        DestKind::Map
    } else if is_named(&field.ty, &["Vec"])
        && first_argument(&field.ty).is_some_and(|v| is_named(v, &maps))
    {
        DestKind::Maps
    } else {
        DestKind::Field
    };
    Some(DestField {
        ident,
        kind,
        pattern,
    })
}

pub fn decode_dests(item: ItemStruct) -> DestsMetadata {
    let fields = item.fields.iter().filter_map(decode_dest).collect();
    let mut model = None;
    for attr in &item.attrs {
        let meta = &attr.meta;
        if meta.path().is_ident("crud") {
            let Ok(list) = meta.require_list() else {
                panic!("Error while parsing `crud`, use it like: `#[crud(model = \"MyModel\")]`");
            };
            let _ = list.parse_nested_meta(|arg| {
                if arg.path.is_ident("model") {
                    let Ok(path) = arg
                        .value()
                        .and_then(ParseBuffer::parse::<LitStr>)
                        .and_then(|v| v.parse::<Path>())
                    else {
                        panic!("Error while parsing `model`, use it like: `#[crud(model = \"MyModel\")]`");
                    };
                    model = Some(path);
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
    let Some(model) = model else {
        panic!(
            "Missing the scanned model of `{}`, use it like: `#[crud(model = \"MyModel\")]`",
            item.ident
        );
    };
    DestsMetadata {
        model,
        fields,
        item,
    }
}
