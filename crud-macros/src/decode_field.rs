use quote::ToTokens;
use syn::{Field, Ident, LitStr, Type, parse::ParseBuffer};

pub(crate) struct FieldMetadata {
    pub(crate) ident: Ident,
    pub(crate) column: String,
    pub(crate) nullable: bool,
    pub(crate) cmp: String,
    pub(crate) join: String,
    pub(crate) filter: String,
    pub(crate) conv: String,
    pub(crate) skip: bool,
}

impl FieldMetadata {
    pub(crate) fn nested(&self) -> bool {
        !self.join.is_empty()
    }
}

fn is_option(ty: &Type) -> bool {
    let Type::Path(path) = ty else {
        return false;
    };
    path.path
        .segments
        .last()
        .is_some_and(|v| v.ident == "Option")
}

pub fn decode_field(field: &Field) -> FieldMetadata {
    let ident = field
        .ident
        .clone()
        .expect("Field is expected to have a name");
    let mut column = ident.to_string();
    if column.starts_with('_') {
        column.remove(0);
    }
    let mut metadata = FieldMetadata {
        ident,
        column,
        nullable: is_option(&field.ty),
        cmp: String::new(),
        join: String::new(),
        filter: String::new(),
        conv: String::new(),
        skip: false,
    };
    for attr in &field.attrs {
        let meta = &attr.meta;
        if meta.path().is_ident("crud") {
            let Ok(list) = meta.require_list() else {
                panic!("Error while parsing `crud`, use it like: `#[crud(attribute = value, ...)]`");
            };
            let _ = list.parse_nested_meta(|arg| {
                let string_value = |attribute: &str, example: &str| {
                    let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                        panic!(
                            "Error while parsing `{}`, use it like: `#[crud({} = \"{}\")]`",
                            attribute, attribute, example
                        );
                    };
                    v.value()
                };
                if arg.path.is_ident("name") {
                    metadata.column = string_value("name", "my_column");
                } else if arg.path.is_ident("cmp") {
                    metadata.cmp = string_value("cmp", "age > $%v");
                } else if arg.path.is_ident("join") {
                    metadata.join = string_value("join", "or");
                } else if arg.path.is_ident("filter") {
                    metadata.filter = string_value("filter", "a,b");
                } else if arg.path.is_ident("conv") {
                    metadata.conv = string_value("conv", "::text");
                } else if arg.path.is_ident("skip") {
                    let Err(..) = arg.value() else {
                        // value() is Err for Meta::Path
                        panic!("Error while parsing `skip`, use it like: `#[crud(skip)]`");
                    };
                    metadata.skip = true;
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
    metadata
}
