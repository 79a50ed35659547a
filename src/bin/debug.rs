use spc7::APU;

pub fn debug_mode(apu: &mut APU) {
    println!("Debug mode.");
    println!("Enter 'h' for help.");
    let mut breaks = std::collections::BTreeSet::new();
    let mut stack_trace = Vec::new();
    loop {
        let mut input = String::new();
        match std::io::stdin().read_line(&mut input) {
            Ok(_) => if input.starts_with("b:") {
                // Add breakpoint
                match u16::from_str_radix(&input[2..].trim(), 16) {
                    Ok(num) => {
                        println!("Inserted breakpoint at ${:04X}", num);
                        breaks.insert(num);
                    },
                    Err(e) => println!("Invalid breakpoint: {}", e),
                }
            } else if input.starts_with("c:") {
                // Remove breakpoint
                match u16::from_str_radix(&input[2..].trim(), 16) {
                    Ok(num) => {
                        println!("Cleared breakpoint at ${:04X}", num);
                        breaks.remove(&num);
                    },
                    Err(e) => println!("Invalid breakpoint: {}", e),
                }
            } else if input.starts_with("c") {
                // Remove all breakpoints
                println!("Cleared all breakpoints");
                breaks.clear();
            } else if input.starts_with("r") {
                // Run
                loop {
                    let state = apu.get_state();
                    if breaks.contains(&state.pc) {
                        println!("Break at ${:04X}", state.pc);
                        break;
                    } else if state.halted {
                        println!("Halted at ${:04X}", state.pc);
                        break;
                    } else {
                        step_and_trace(apu, &mut stack_trace, false);
                    }
                }
            } else if input.starts_with("s:") {
                // Step x times
                match usize::from_str_radix(&input[2..].trim(), 10) {
                    Ok(num) => {
                        for _ in 0..num {
                            step_and_trace(apu, &mut stack_trace, true);
                        }
                    },
                    Err(e) => println!("Invalid number of steps: {}", e),
                }
            } else if input.starts_with("s") {
                // Step
                step_and_trace(apu, &mut stack_trace, true);
            } else if input.starts_with("d:") {
                // Print DSP register
                match u8::from_str_radix(&input[2..].trim(), 16) {
                    Ok(num) => println!("DSP ${:02X}: ${:02X}", num, apu.get_dsp_reg(num)),
                    Err(e) => println!("Invalid DSP register: {}", e),
                }
            } else if input.starts_with("v:") {
                // Print voice state
                match usize::from_str_radix(&input[2..].trim(), 10) {
                    Ok(num) if num < 8 => println!("Voice {}: {}", num, apu.get_voice_state(num).to_string()),
                    Ok(num) => println!("Invalid voice: {}", num),
                    Err(e) => println!("Invalid voice: {}", e),
                }
            } else if input.starts_with("v") {
                // Print all voices
                println!("kon: b{:08b} koff: b{:08b} endx: b{:08b}",
                    apu.get_dsp_reg(0x4C), apu.get_dsp_reg(0x5C), apu.get_dsp_reg(0x7C));
                for num in 0..8 {
                    println!("Voice {}: {}", num, apu.get_voice_state(num).to_string());
                }
            } else if input.starts_with("p:") {
                // Print cpu or mem state
                print(&input[2..].trim(), apu);
            } else if input.starts_with("p") {
                // Print state
                println!("{}", apu.get_state().to_string());
            } else if input.starts_with("t") {
                let trace = stack_trace.iter()
                    .map(|n| format!("${:04X}", n))
                    .collect::<Vec<_>>()
                    .join("\n");
                println!("{}", trace);
            } else if input.starts_with("h") {
                // Help
                help();
            } else if input.starts_with("q") {
                break;
            },
            Err(e) => println!("Input error: {}", e),
        }
    }
}

fn print(s: &str, apu: &APU) {
    match s {
        "a" => println!("a: ${:02X}", apu.get_state().a),
        "x" => println!("x: ${:02X}", apu.get_state().x),
        "y" => println!("y: ${:02X}", apu.get_state().y),
        "sp" => println!("sp: ${:02X}", apu.get_state().sp),
        "pc" => println!("pc: ${:04X}", apu.get_state().pc),
        "ps" => println!("ps: b{:08b}", apu.get_state().ps),
        "clock" => {
            let (cycles, target, released) = apu.get_clock();
            println!("cycles: {} target: {} samples: {}", cycles, target, released);
        },
        "timers" => {
            let timers = apu.get_timers();
            println!("timers: {:X} {:X} {:X}", timers[0], timers[1], timers[2]);
        },
        s => {
            // Memory range
            if let Some(x) = s.find('-') {
                match u16::from_str_radix(&s[..x], 16) {
                    Ok(start) => match u16::from_str_radix(&s[(x+1)..], 16) {
                        Ok(end) => {
                            println!("${:04X} - ${:04X}:", start, end);
                            let mems = (start..end).map(|n| format!("{:02X}", apu.get_mem_at(n)))
                                .collect::<Vec<_>>()
                                .join(" ");
                            println!("{}", mems);
                        },
                        Err(e) => println!("Invalid p tag: {}", e),
                    },
                    Err(e) => println!("Invalid p tag: {}", e),
                }
            } else {    // Single location
                match u16::from_str_radix(s, 16) {
                    Ok(num) => println!("${:04X}: ${:02X}", num, apu.get_mem_at(num)),
                    Err(e) => println!("Invalid p tag: {}", e),
                }
            }
        }
    }
}

fn help() {
    println!("b:x: New breakpoint at memory location x (hex).");
    println!("c:x: Clear breakpoint at memory location x (hex).");
    println!("r: Keep running until a breakpoint is hit, or the processor halts.");
    println!("s: Step a single instruction.");
    println!("s:x: Step multiple instructions (base 10).");
    println!("t: Print the stack trace (all the call locations).");
    println!("p: Print the current state of the SPC.");
    println!("p:x: Print x - if x is a number, print the contents of that address, otherwise print the register (or 'timers' / 'clock').");
    println!("p:x-y: Print the memory in the range x -> y.");
    println!("d:x: Print DSP register x (hex).");
    println!("v: Print the key registers and the state of every voice.");
    println!("v:x: Print the state of voice x (0-7).");
    println!("q: Quit execution.");
}

// Step the SPC, and add the PC to the stack trace if it calls.
fn step_and_trace(apu: &mut APU, stack_trace: &mut Vec<u16>, print: bool) {
    let instr = apu.get_instr();
    let pc = apu.get_state().pc;
    match instr[0] {
        // CALL, PCALL, TCALL, BRK
        0x3F | 0x4F | 0x0F => stack_trace.push(pc),
        op if op & 0xF == 0x1 => stack_trace.push(pc),
        // RET, RETI
        0x6F | 0x7F => {
            stack_trace.pop();
        },
        _ => {}
    }

    if print {
        println!("${:04X}: ${:02X} ({:02X} {:02X})", pc, instr[0], instr[1], instr[2]);
    }

    apu.step();
}
