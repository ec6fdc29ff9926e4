pub mod camera;
pub mod controller;
pub mod movement;

pub use camera::{Camera3D, CameraPreset, FirstPersonRig, OrbitCamera};
pub use controller::{ModeSwitch, NoCapture, PointerCapture, ViewController, ViewMode, ViewState, WindowCapture};
pub use movement::{MoveDirection, MovementController, MovementState, PlayerPose};
