//! Opaque resources
//!
//! Anything `'static + Send + Sync` can be authorized. The enforcer only
//! needs a resource's runtime type: its [`TypeId`](std::any::TypeId) for
//! policy dispatch and its short type name for error messages.
//!
//! A `Box<dyn Resource>` is a resource of its own type. The enforcer and
//! the policy resolver look through it with [`inner_resource`], so passing
//! `&model` for a boxed model decides on the model itself.

use std::any::Any;

/// A domain object subject to a policy check
pub trait Resource: Any + Send + Sync {
    /// Borrow as `Any` for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Convert a boxed resource into a boxed `Any`
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync>;

    /// Type name without module paths (e.g. `Article`, `Vec<Article>`)
    fn resource_type(&self) -> String;
}

impl<T: Any + Send + Sync> Resource for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send + Sync> {
        self
    }

    fn resource_type(&self) -> String {
        short_type_name(std::any::type_name::<T>())
    }
}

/// The resource behind any number of `Box<dyn Resource>` layers
pub fn inner_resource(resource: &dyn Resource) -> &dyn Resource {
    let mut current = resource;
    while let Some(boxed) = current.as_any().downcast_ref::<Box<dyn Resource>>() {
        current = &**boxed;
    }
    current
}

/// Strip module paths from every path segment of a type name.
///
/// `alloc::vec::Vec<blog::Article>` becomes `Vec<Article>`.
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut token = String::new();

    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            token.push(c);
        } else {
            push_last_segment(&mut out, &token);
            token.clear();
            out.push(c);
        }
    }
    push_last_segment(&mut out, &token);

    out
}

fn push_last_segment(out: &mut String, token: &str) {
    if let Some(segment) = token.rsplit("::").next() {
        out.push_str(segment);
    }
}
