/// Command ids carried in the third byte of a `COMM` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandType {
    /// Thruster PWM values.
    Motor = 0,
    /// Arm actuator values.
    Arm = 1,
    /// Sensor polling registration.
    Sensor = 2,
}

impl CommandType {
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

impl From<CommandType> for u8 {
    fn from(command: CommandType) -> Self {
        command.as_byte()
    }
}

impl TryFrom<u8> for CommandType {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(CommandType::Motor),
            1 => Ok(CommandType::Arm),
            2 => Ok(CommandType::Sensor),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_bytes() {
        assert_eq!(u8::from(CommandType::Motor), 0);
        assert_eq!(u8::from(CommandType::Arm), 1);
        assert_eq!(u8::from(CommandType::Sensor), 2);
        assert_eq!(CommandType::try_from(2), Ok(CommandType::Sensor));
        assert_eq!(CommandType::try_from(7), Err(7));
    }
}
