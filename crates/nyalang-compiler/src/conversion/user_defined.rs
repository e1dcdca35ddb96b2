//! User-defined conversion operators.
//!
//! A conversion operator is a static `op_Implicit` or `op_Explicit` method
//! with a single parameter of the source type returning the target type. It
//! may live on either type; the source type is searched first.

use nyalang_core::{MethodId, TypeId};

use crate::image::ProgramImage;

const OPERATOR_NAMES: [&str; 2] = ["op_Implicit", "op_Explicit"];

/// Find a conversion operator from `src` to `dst`.
pub fn find_user_conversion(image: &ProgramImage, src: TypeId, dst: TypeId) -> Option<MethodId> {
    [src, dst].into_iter().find_map(|owner| {
        OPERATOR_NAMES.iter().find_map(|name| {
            image
                .methods_named(Some(owner), name)
                .into_iter()
                .find(|&m| {
                    let method = image.method(m);
                    method.is_static() && method.return_type == dst && method.param_types() == [src]
                })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::host;

    #[test]
    fn finds_operator_on_target_type() {
        let image = ProgramImage::new();
        let method = find_user_conversion(&image, host::INT64, host::DECIMAL).unwrap();
        assert_eq!(image.method(method).owner, Some(host::DECIMAL));
        assert_eq!(image.method(method).name, "op_Implicit");
    }

    #[test]
    fn explicit_operators_are_selected_by_return_type() {
        let image = ProgramImage::new();
        let to_byte = find_user_conversion(&image, host::DECIMAL, host::BYTE).unwrap();
        let to_long = find_user_conversion(&image, host::DECIMAL, host::INT64).unwrap();
        assert_ne!(to_byte, to_long);
        assert_eq!(image.method(to_long).return_type, host::INT64);
    }

    #[test]
    fn no_operator_between_unrelated_types() {
        let image = ProgramImage::new();
        assert_eq!(find_user_conversion(&image, host::STRING, host::REGEX), None);
    }
}
