//! Stylesheet injected once per page load
//!
//! Gives foil badges a darker card with a shine sweeping across it on a loop.

pub const FOIL_STYLE: &str = r#"
.steam-badge-item.foil {
    position: relative;
    overflow: hidden;
    background-color: #222;
    border: 1px solid rgba(255, 255, 255, 0.1);
    box-shadow: 0 0 10px rgba(255, 255, 245, 0.1);
}

.steam-badge-item.foil::before {
    content: '';
    position: absolute;
    top: 0;
    left: 0;
    width: 100%;
    height: 100%;
    background: linear-gradient(
        45deg,
        rgba(255, 255, 255, 0) 0%,
        rgba(255, 255, 255, 0.2) 0%,
        rgba(255, 255, 255, 0) 0%
    );
    background-size: 200% 100%;
    animation: shine 3s linear infinite;
}

@keyframes shine {
    0% {
        background-position: -200% center;
    }
    100% {
        background-position: 200% center;
    }
}
"#;
