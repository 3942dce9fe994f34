/// Decode command.
pub mod decode;
/// Primitive listing command.
pub mod primitives;
/// Transform spec parsing shared by commands.
pub(crate) mod spec;
/// Output helpers.
pub(crate) mod util;

#[cfg(test)]
pub(crate) mod test_support;
