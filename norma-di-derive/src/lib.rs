//! Derive macro for norma-di
//!
//! `#[derive(Inspectable)]` describes a struct to the container: its `#[inject]` fields
//! become constructor parameters, every other field is filled with `Default::default()`.
//!
//! # Example
//!
//! ```rust,ignore
//! use norma_di::{Container, Inspectable};
//! use std::sync::Arc;
//!
//! #[derive(Inspectable)]
//! #[inspectable(name = "App\\Mail\\Transport")]
//! struct Transport;
//!
//! #[derive(Inspectable)]
//! #[inspectable(name = "App\\Mail\\Mailer")]
//! struct Mailer {
//!     // Typed by the Arc target: resolves the class registered for it
//!     #[inject(component = "App.Mail.transport", lazy)]
//!     transport: Arc<Transport>,
//!     // Looked up through `@inject $host App.Mail.host`
//!     #[inject(component = "App.Mail.host")]
//!     host: String,
//!     #[inject(default = 25)]
//!     port: i64,
//!     // Not injected
//!     sent: u64,
//! }
//!
//! let container = Container::new();
//! container.register::<Transport>();
//! container.register::<Mailer>();
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Expr, Fields, GenericArgument, LitStr, PathArguments, Type,
    parse_macro_input,
};

/// Derive `norma_di::Inspectable`.
///
/// # Container attributes
///
/// - `#[inspectable(name = "App\\Mailer")]` - class name (default: the Rust type name)
/// - `#[inspectable(sealed)]` - the class cannot be proxied lazily
///
/// # Field attributes
///
/// - `#[inject]` - constructor parameter. `Arc<T>` is typed by `T`, `Arc<dyn T>` is cast
///   through the class's registered interfaces, `Option<Arc<_>>` is optional, anything
///   else is converted with `FromValue`.
/// - `#[inject(component = "X")]` - resolve the named component instead of the type
/// - `#[inject(component = "X", lazy, scope = "instance")]` - lifecycle of that component
/// - `#[inject(type = "X")]` - explicit type hint
/// - `#[inject(default = expr)]` - optional parameter with a default value
#[proc_macro_derive(Inspectable, attributes(inspectable, inject))]
pub fn derive_inspectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Inspectable cannot be derived for generic types",
        ));
    }

    let class = ClassAttr::parse(&input.attrs)?;

    // Unit structs have an empty constructor
    let fields: Vec<&syn::Field> = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields.named.iter().collect(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Inspectable can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Inspectable can only be derived for structs",
            ));
        }
    };

    let mut params = Vec::new();
    let mut docs = Vec::new();
    let mut inits = Vec::new();

    for field in &fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let Some(inject) = InjectAttr::find(&field.attrs)? else {
            inits.push(quote! { #ident: ::std::default::Default::default() });
            continue;
        };

        let param_name = ident.to_string().trim_start_matches("r#").to_string();
        let shape = FieldShape::of(&field.ty);

        let mut param = match (&inject.type_hint, &inject.component, &shape) {
            (Some(hint), _, _) => quote! { ::norma_di::Parameter::typed(#param_name, #hint) },
            // An annotation names the component; a type hint would take precedence.
            (None, Some(_), _) => quote! { ::norma_di::Parameter::new(#param_name) },
            (None, None, FieldShape::Arc(inner) | FieldShape::OptionalArc(inner)) => quote! {
                ::norma_di::Parameter::typed(#param_name, ::norma_di::type_key::<#inner>())
            },
            (None, None, FieldShape::Other) => quote! { ::norma_di::Parameter::new(#param_name) },
        };
        if let Some(default) = &inject.default {
            param = quote! { #param.with_default(#default) };
        } else if matches!(shape, FieldShape::OptionalArc(_)) {
            param = quote! { #param.with_default(::norma_di::Value::Null) };
        }
        params.push(param);

        if let Some(component) = &inject.component {
            let mut line = format!("@inject ${param_name} {}", component.value());
            if inject.lazy {
                line.push_str(" lazy");
            }
            if let Some(scope) = &inject.scope {
                line.push_str(&format!(" scope={}", scope.value()));
            }
            docs.push(line);
        } else if inject.lazy || inject.scope.is_some() {
            return Err(syn::Error::new_spanned(
                ident,
                "`lazy` and `scope` require `component`",
            ));
        }

        let value = match &shape {
            FieldShape::Arc(inner) if is_trait_object(inner) => {
                quote! { args.cast::<#inner>(#param_name)? }
            }
            FieldShape::Arc(inner) => quote! { args.instance::<#inner>(#param_name)? },
            FieldShape::OptionalArc(inner) if is_trait_object(inner) => {
                quote! { args.optional_cast::<#inner>(#param_name)? }
            }
            FieldShape::OptionalArc(inner) => quote! { args.optional::<#inner>(#param_name)? },
            FieldShape::Other => {
                let ty = &field.ty;
                quote! { args.extract::<#ty>(#param_name)? }
            }
        };
        inits.push(quote! { #ident: #value });
    }

    let builder = match &class.name {
        Some(class_name) => quote! { ::norma_di::ClassBuilder::<Self>::new(#class_name) },
        None => quote! { ::norma_di::ClassBuilder::<Self>::of_type() },
    };
    let sealed = class.sealed;
    let construct = if fields.is_empty() && is_unit(input) {
        quote! { Self }
    } else {
        quote! { Self { #(#inits),* } }
    };

    Ok(quote! {
        impl ::norma_di::Inspectable for #name {
            fn describe() -> ::norma_di::ClassDescriptor {
                let signature = ::norma_di::Signature::new()
                    #(.param(#params))*
                    #(.doc(#docs))*;
                #builder
                    .sealed(#sealed)
                    .constructor(signature, |args: &mut ::norma_di::Arguments| {
                        let _ = &args;
                        ::std::result::Result::Ok(#construct)
                    })
                    .build()
            }
        }
    })
}

/// `#[inspectable(...)]` on the struct
#[derive(Default)]
struct ClassAttr {
    name: Option<LitStr>,
    sealed: bool,
}

impl ClassAttr {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut class = ClassAttr::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("inspectable")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    class.name = Some(meta.value()?.parse()?);
                    Ok(())
                } else if meta.path.is_ident("sealed") {
                    class.sealed = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `name = \"...\"` or `sealed`"))
                }
            })?;
        }
        Ok(class)
    }
}

/// `#[inject(...)]` on a field
#[derive(Default)]
struct InjectAttr {
    component: Option<LitStr>,
    lazy: bool,
    scope: Option<LitStr>,
    type_hint: Option<LitStr>,
    default: Option<Expr>,
}

impl InjectAttr {
    fn find(attrs: &[Attribute]) -> syn::Result<Option<Self>> {
        let Some(attr) = attrs.iter().find(|attr| attr.path().is_ident("inject")) else {
            return Ok(None);
        };

        let mut inject = InjectAttr::default();
        if attr.meta.require_path_only().is_ok() {
            return Ok(Some(inject));
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("component") {
                inject.component = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("lazy") {
                inject.lazy = true;
            } else if meta.path.is_ident("scope") {
                let scope: LitStr = meta.value()?.parse()?;
                if !matches!(scope.value().to_ascii_lowercase().as_str(), "singleton" | "instance") {
                    return Err(syn::Error::new_spanned(
                        &scope,
                        "scope must be \"singleton\" or \"instance\"",
                    ));
                }
                inject.scope = Some(scope);
            } else if meta.path.is_ident("type") {
                inject.type_hint = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("default") {
                inject.default = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("unsupported inject option"));
            }
            Ok(())
        })?;
        Ok(Some(inject))
    }
}

enum FieldShape<'a> {
    Arc(&'a Type),
    OptionalArc(&'a Type),
    Other,
}

impl<'a> FieldShape<'a> {
    fn of(ty: &'a Type) -> Self {
        if let Some(inner) = generic_argument(ty, "Arc") {
            return FieldShape::Arc(inner);
        }
        match generic_argument(ty, "Option").and_then(|inner| generic_argument(inner, "Arc")) {
            Some(inner) => FieldShape::OptionalArc(inner),
            None => FieldShape::Other,
        }
    }
}

/// Extract `T` from `Wrapper<T>`
fn generic_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn is_unit(input: &DeriveInput) -> bool {
    matches!(&input.data, Data::Struct(data) if matches!(data.fields, Fields::Unit))
}

fn is_trait_object(ty: &Type) -> bool {
    matches!(ty, Type::TraitObject(_))
}
