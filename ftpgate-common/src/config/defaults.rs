pub(crate) use crate::account::_default_true;

#[inline]
pub(crate) fn _default_admin_name() -> String {
    "admin".to_owned()
}
