/// Interned translation key.
#[salsa::interned]
pub struct I18nKey {
    /// Fully-qualified dotted key text (e.g. `users.show.title`).
    #[returns(ref)]
    pub text: String,
}
