/*!
 * Handler 向け extractor
 *
 * Public API:
 * - CurrentAuthentication
 */

mod current_authentication;

pub use current_authentication::CurrentAuthentication;
