/// Common surface shared by descriptor and signature values.
///
/// `as_internal` renders the VM form (`Ljava/lang/String;`), `as_readable`
/// renders the source form (`java.lang.String`).
pub trait TypeRepresentable {
    fn as_internal(&self) -> &str;

    fn as_readable(&self) -> String;
}
