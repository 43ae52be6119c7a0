use bytes::Bytes;
use pingora_core::{Error as PingoraError, ErrorType, Result as PingoraResult};
use pingora_http::ResponseHeader;
use pingora_proxy::Session;

/// 写出纯文本错误响应
pub async fn write_text_error(session: &mut Session, status: u16, message: &str) -> PingoraResult<()> {
    let body = Bytes::from(format!("{message}\n"));

    let mut resp = ResponseHeader::build(status, Some(3)).map_err(|err| {
        PingoraError::explain(
            ErrorType::InternalError,
            format!("Failed to build error response header: {err}"),
        )
    })?;
    resp.insert_header("content-type", "text/plain; charset=utf-8")
        .map_err(|err| {
            PingoraError::explain(
                ErrorType::InternalError,
                format!("Failed to set content-type header: {err}"),
            )
        })?;
    resp.set_content_length(body.len()).map_err(|err| {
        PingoraError::explain(
            ErrorType::InternalError,
            format!("Failed to set content-length: {err}"),
        )
    })?;

    session.write_response_header(Box::new(resp), false).await?;
    session.write_response_body(Some(body), true).await?;
    Ok(())
}
