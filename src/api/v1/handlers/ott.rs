/*
 * Responsibility
 * - POST /ott/generate のうち、filter が処理しなかったもの (username なし) を受ける
 * - 正常系は GenerateOneTimeTokenFilter が 302 を返すため、ここには来ない
 */
use crate::error::AppError;

pub async fn ott_generate() -> AppError {
    AppError::InvalidRequest("username is required".into())
}
