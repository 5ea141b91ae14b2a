/*
 * Responsibility
 * - Public interface of the middleware stack
 */
pub mod http;
