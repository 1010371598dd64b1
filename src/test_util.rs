#[cfg(test)]
pub(crate) fn with_temp_home<F, R>(func: F) -> R
where
    F: FnOnce(&std::path::Path) -> R,
{
    static HOME_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
    let _guard = HOME_MUTEX
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let dir = tempfile::tempdir().expect("tempdir");
    let old_home = std::env::var("HOME").ok();
    let old_base_url = std::env::var(crate::settings::BASE_URL_ENV).ok();
    // SAFETY: guarded by HOME_MUTEX; tests only touch these variables inside it.
    unsafe {
        std::env::set_var("HOME", dir.path());
        std::env::remove_var(crate::settings::BASE_URL_ENV);
    }
    let result = func(dir.path());
    unsafe {
        match old_home {
            Some(old) => std::env::set_var("HOME", old),
            None => std::env::remove_var("HOME"),
        }
        match old_base_url {
            Some(old) => std::env::set_var(crate::settings::BASE_URL_ENV, old),
            None => std::env::remove_var(crate::settings::BASE_URL_ENV),
        }
    }
    result
}
