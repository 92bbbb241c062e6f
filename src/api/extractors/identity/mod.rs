/*!
 * Authenticated identity extractor
 *
 * Responsibility:
 * - 認証済みリクエストの Identity を handler に提供する
 * - 型そのものは services::auth::identity に置き、ここは axum 依存の取り出しだけ
 */

mod core;

pub use core::IdentityExtractor;
