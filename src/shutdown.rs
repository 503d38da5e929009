use tokio::sync::watch;

/// Resolves once the shutdown flag reads `true` or its sender is dropped.
///
/// The borrowed value is released before returning, so the future stays
/// `Send` inside `tokio::select!` in spawned tasks.
pub async fn signalled(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_resolves_when_flag_flips() {
        let (tx, mut rx) = watch::channel(false);
        let task = tokio::spawn(async move { signalled(&mut rx).await });
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_resolves_when_sender_dropped() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), signalled(&mut rx))
            .await
            .unwrap();
    }
}
