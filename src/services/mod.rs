/*
 * Responsibility
 * - auth: token 検証 / 認可ポリシー
 * - gateway: route table と upstream への転送
 */
pub mod auth;
pub mod gateway;
